//! Little-endian descriptor encoding.
//!
//! Layout, in order: header (`ARBR`, version, reserved, name), symbols,
//! field names (v2+), lexer, parse table, productions, ambiguity policy (v3+).
//! Every count precedes its items.

use crate::tables::{AmbiguityPolicy, LanguageData, LexAccept, LexTable, ParseAction, ParseTable};
use crate::validate::validate_version;
use crate::{FieldId, LoadError, MAGIC, Production, ProductionId, StateId, Symbol, SymbolInfo};

pub(crate) fn encode(data: &LanguageData, version: u16) -> Vec<u8> {
    let mut w = Writer::default();

    w.bytes(&MAGIC);
    w.u16(version);
    w.u16(0);
    w.str(&data.name);

    w.u16(data.symbols.len() as u16);
    w.u16(data.terminal_count);
    for symbol in &data.symbols {
        w.str(&symbol.name);
        w.u8(symbol.flags());
    }

    if version >= 2 {
        w.u16(data.field_names.len() as u16);
        for name in &data.field_names {
            w.str(name);
        }
    }

    let lex = &data.lex;
    w.u16(lex.class_count);
    w.bytes(&lex.byte_classes);
    w.u32(lex.accept.len() as u32);
    for accept in &lex.accept {
        w.u16(accept.encode());
    }
    for &next in &lex.transitions {
        w.u16(next);
    }
    w.u16(lex.modes.len() as u16);
    for &mode in &lex.modes {
        w.u16(mode);
    }

    let parse = &data.parse;
    w.u16(parse.state_count);
    for &mode in &parse.lex_modes {
        w.u16(mode);
    }
    w.u32(parse.action_lists.len() as u32);
    for list in &parse.action_lists {
        w.u16(list.len() as u16);
        for action in list {
            let (tag, payload) = match *action {
                ParseAction::Shift(state) => (ParseAction::SHIFT, state.0),
                ParseAction::Reduce(production) => (ParseAction::REDUCE, production.0),
                ParseAction::Goto(state) => (ParseAction::GOTO, state.0),
                ParseAction::Accept => (ParseAction::ACCEPT, 0),
            };
            w.u8(tag);
            w.u16(payload);
        }
    }
    for &cell in &parse.cells {
        w.u32(cell);
    }

    w.u16(data.productions.len() as u16);
    for production in &data.productions {
        w.u16(production.lhs.0);
        w.u16(production.child_count);
        if version >= 3 {
            w.u16(production.dynamic_precedence as u16);
        }
        if version >= 2 {
            w.u16(production.fields.len() as u16);
            for &(child, field) in &production.fields {
                w.u16(child);
                w.u16(field.get());
            }
        }
    }

    if version >= 3 {
        w.u8(data.ambiguity.encode());
    }

    w.buf
}

pub(crate) fn decode(bytes: &[u8]) -> Result<LanguageData, LoadError> {
    let mut r = Reader { bytes, pos: 0, section: "header" };

    if r.take(MAGIC.len())? != MAGIC {
        return Err(LoadError::malformed("header", "missing `ARBR` magic"));
    }
    let version = r.u16()?;
    validate_version(version)?;
    let _reserved = r.u16()?;
    let name = r.string()?;

    r.section = "symbols";
    let symbol_count = r.u16()?;
    let terminal_count = r.u16()?;
    let mut symbols = Vec::new();
    for _ in 0..symbol_count {
        let name = r.string()?;
        let flags = r.u8()?;
        symbols.push(SymbolInfo::from_flags(name, flags));
    }

    r.section = "fields";
    let mut field_names = Vec::new();
    if version >= 2 {
        for _ in 0..r.u16()? {
            field_names.push(r.string()?);
        }
    }

    r.section = "lexer";
    let class_count = r.u16()?;
    let mut byte_classes = [0; 256];
    byte_classes.copy_from_slice(r.take(256)?);
    let lex_state_count = r.u32()? as usize;
    r.ensure(lex_state_count * 2)?;
    let mut accept = Vec::with_capacity(lex_state_count);
    for _ in 0..lex_state_count {
        accept.push(LexAccept::decode(r.u16()?));
    }
    let transition_count = lex_state_count * class_count as usize;
    r.ensure(transition_count * 2)?;
    let mut transitions = Vec::with_capacity(transition_count);
    for _ in 0..transition_count {
        transitions.push(r.u16()?);
    }
    let mut modes = Vec::new();
    for _ in 0..r.u16()? {
        modes.push(r.u16()?);
    }

    r.section = "parse table";
    let state_count = r.u16()?;
    let mut lex_modes = Vec::with_capacity(state_count as usize);
    for _ in 0..state_count {
        lex_modes.push(r.u16()?);
    }
    let list_count = r.u32()? as usize;
    r.ensure(list_count * 2)?;
    let mut action_lists = Vec::with_capacity(list_count);
    for _ in 0..list_count {
        let len = r.u16()?;
        let mut list = Vec::with_capacity(len as usize);
        for _ in 0..len {
            let tag = r.u8()?;
            let payload = r.u16()?;
            list.push(match tag {
                ParseAction::SHIFT => ParseAction::Shift(StateId(payload)),
                ParseAction::REDUCE => ParseAction::Reduce(ProductionId(payload)),
                ParseAction::GOTO => ParseAction::Goto(StateId(payload)),
                ParseAction::ACCEPT => ParseAction::Accept,
                tag => return Err(r.error(format!("unknown action tag {tag}"))),
            });
        }
        action_lists.push(list);
    }
    let cell_count = state_count as usize * symbol_count as usize;
    r.ensure(cell_count * 4)?;
    let mut cells = Vec::with_capacity(cell_count);
    for _ in 0..cell_count {
        cells.push(r.u32()?);
    }

    r.section = "productions";
    let mut productions = Vec::new();
    for _ in 0..r.u16()? {
        let lhs = Symbol(r.u16()?);
        let child_count = r.u16()?;
        let dynamic_precedence = if version >= 3 { r.u16()? as i16 } else { 0 };
        let mut fields = Vec::new();
        if version >= 2 {
            for _ in 0..r.u16()? {
                let child = r.u16()?;
                let field = FieldId::new(r.u16()?)
                    .ok_or_else(|| r.error("field id 0 used in a production"))?;
                fields.push((child, field));
            }
        }
        productions.push(Production { lhs, child_count, dynamic_precedence, fields });
    }

    r.section = "trailer";
    let ambiguity = if version >= 3 {
        let raw = r.u8()?;
        AmbiguityPolicy::decode(raw)
            .ok_or_else(|| r.error(format!("unknown ambiguity policy {raw}")))?
    } else {
        AmbiguityPolicy::default()
    };
    if r.pos != bytes.len() {
        return Err(r.error(format!("{} trailing bytes", bytes.len() - r.pos)));
    }

    Ok(LanguageData {
        version,
        name,
        symbols,
        terminal_count,
        field_names,
        lex: LexTable { byte_classes, class_count, accept, transitions, modes },
        parse: ParseTable { state_count, cells, action_lists, lex_modes },
        productions,
        ambiguity,
    })
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.bytes(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.bytes(&value.to_le_bytes());
    }

    fn str(&mut self, value: &str) {
        self.u32(value.len() as u32);
        self.bytes(value.as_bytes());
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    section: &'static str,
}

impl<'a> Reader<'a> {
    fn error(&self, reason: impl Into<String>) -> LoadError {
        LoadError::malformed(self.section, reason)
    }

    /// Fails early when fewer than `len` bytes remain, before allocating.
    fn ensure(&self, len: usize) -> Result<(), LoadError> {
        if self.bytes.len() - self.pos < len {
            return Err(self.error(format!("truncated at byte {}", self.pos)));
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], LoadError> {
        self.ensure(len)?;
        let bytes = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, LoadError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, LoadError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn string(&mut self) -> Result<String, LoadError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|err| self.error(err.to_string()))
    }
}
