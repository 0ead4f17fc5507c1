use std::fmt;

use triomphe::Arc;

use crate::codec;
use crate::tables::{AmbiguityPolicy, LanguageData, LexTable, ParseAction};
use crate::validate::validate;
use crate::{FieldId, LANGUAGE_VERSION, LoadError, Production, ProductionId, StateId, Symbol};

/// Validated, immutable handle to a loaded grammar.
///
/// Cloning is cheap and the handle can be shared across threads; every parse
/// reads the same tables without locking.
#[derive(Clone)]
pub struct Language {
    data: Arc<LanguageData>,
}

impl Language {
    /// Decodes and validates a descriptor.
    pub fn load(bytes: &[u8]) -> Result<Self, LoadError> {
        let data = codec::decode(bytes)?;
        let language = Self::from_data(data)?;
        tracing::debug!(
            name = language.name(),
            version = language.version(),
            symbols = language.symbol_count(),
            states = language.state_count(),
            "loaded grammar"
        );
        Ok(language)
    }

    /// Validates already decoded tables.
    pub fn from_data(data: LanguageData) -> Result<Self, LoadError> {
        validate(&data)?;
        Ok(Self { data: Arc::new(data) })
    }

    pub fn data(&self) -> &LanguageData {
        &self.data
    }

    pub fn version(&self) -> u16 {
        self.data.version
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn symbol_count(&self) -> usize {
        self.data.symbols.len()
    }

    pub fn terminal_count(&self) -> usize {
        self.data.terminal_count as usize
    }

    pub fn state_count(&self) -> usize {
        self.data.parse.state_count as usize
    }

    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        symbol == Symbol::ERROR || symbol.0 < self.data.terminal_count
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        match self.data.symbols.get(symbol.index()) {
            Some(info) => &info.name,
            None => "ERROR",
        }
    }

    /// Looks a symbol up by name, preferring named symbols over literals that
    /// happen to be spelled the same.
    pub fn symbol_for_name(&self, name: &str, named: bool) -> Option<Symbol> {
        if name == "ERROR" {
            return Some(Symbol::ERROR);
        }
        self.data
            .symbols
            .iter()
            .position(|info| info.name == name && info.named == named)
            .map(|index| Symbol(index as u16))
    }

    pub fn is_named(&self, symbol: Symbol) -> bool {
        self.data.symbols.get(symbol.index()).is_none_or(|info| info.named)
    }

    pub fn is_visible(&self, symbol: Symbol) -> bool {
        self.data.symbols.get(symbol.index()).is_none_or(|info| info.visible)
    }

    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.data.symbols.get(symbol.index()).is_some_and(|info| info.extra)
    }

    pub fn field_count(&self) -> usize {
        self.data.field_names.len()
    }

    /// `None` for ids this grammar does not define.
    pub fn field_name(&self, field: FieldId) -> Option<&str> {
        self.data.field_names.get(field.get() as usize - 1).map(String::as_str)
    }

    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        let index = self.data.field_names.iter().position(|field| field == name)?;
        FieldId::new(index as u16 + 1)
    }

    /// Actions for `symbol` in `state`. Empty means a syntax error; the
    /// builtin error symbol always has no actions.
    #[inline]
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[ParseAction] {
        if symbol.index() >= self.data.symbols.len() {
            return &[];
        }
        let list = self.data.parse.cells[self.data.cell(state, symbol)];
        &self.data.parse.action_lists[list as usize]
    }

    /// Target of the goto entry for non-terminal `symbol`.
    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.actions(state, symbol).iter().find_map(|action| match *action {
            ParseAction::Goto(next) => Some(next),
            _ => None,
        })
    }

    pub fn has_actions(&self, state: StateId, symbol: Symbol) -> bool {
        !self.actions(state, symbol).is_empty()
    }

    pub fn lex_mode(&self, state: StateId) -> u16 {
        self.data.parse.lex_modes[state.index()]
    }

    pub fn lex_table(&self) -> &LexTable {
        &self.data.lex
    }

    pub fn production(&self, production: ProductionId) -> &Production {
        &self.data.productions[production.index()]
    }

    pub fn ambiguity_policy(&self) -> AmbiguityPolicy {
        self.data.ambiguity
    }

    /// Re-encodes the tables with the current ABI version.
    /// Encodes with the layout of the version the grammar was loaded as.
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(&self.data, self.data.version)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.data == other.data
    }
}

impl Eq for Language {}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("symbols", &self.symbol_count())
            .field("states", &self.state_count())
            .finish_non_exhaustive()
    }
}

impl LanguageData {
    /// Encodes with the current ABI version.
    pub fn encode(&self) -> Vec<u8> {
        codec::encode(self, LANGUAGE_VERSION)
    }

    /// Encodes with an older layout; sections the version lacks are dropped.
    pub fn encode_as(&self, version: u16) -> Vec<u8> {
        codec::encode(self, version)
    }
}
