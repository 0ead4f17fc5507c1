use crate::tables::{DEAD_STATE, LanguageData, LexAccept, ParseAction};
use crate::{LANGUAGE_VERSION, LoadError, MIN_COMPATIBLE_LANGUAGE_VERSION, Symbol, SymbolKind};

/// Checks the ABI tag and that every id referenced by the tables is in range.
pub(crate) fn validate(data: &LanguageData) -> Result<(), LoadError> {
    validate_version(data.version)?;
    validate_symbols(data)?;
    validate_lexer(data)?;
    validate_productions(data)?;
    validate_parse_table(data)
}

pub(crate) fn validate_version(version: u16) -> Result<(), LoadError> {
    if !(MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&version) {
        return Err(LoadError::IncompatibleVersion {
            version,
            min: MIN_COMPATIBLE_LANGUAGE_VERSION,
            max: LANGUAGE_VERSION,
        });
    }
    Ok(())
}

fn validate_symbols(data: &LanguageData) -> Result<(), LoadError> {
    let err = |reason: String| Err(LoadError::malformed("symbols", reason));

    let count = data.symbols.len();
    if count == 0 || count >= Symbol::ERROR.index() {
        return err(format!("symbol count {count} out of range"));
    }
    if data.terminal_count == 0 || data.terminal_count as usize > count {
        return err(format!("terminal count {} out of range", data.terminal_count));
    }
    for (index, symbol) in data.symbols.iter().enumerate() {
        if symbol.extra && index >= data.terminal_count as usize {
            return err(format!("non-terminal `{}` is marked extra", symbol.name));
        }
    }
    Ok(())
}

fn validate_lexer(data: &LanguageData) -> Result<(), LoadError> {
    let err = |reason: String| Err(LoadError::malformed("lexer", reason));
    let lex = &data.lex;

    if lex.class_count == 0 || lex.class_count > 256 {
        return err(format!("class count {} out of range", lex.class_count));
    }
    if let Some(byte) = lex.byte_classes.iter().position(|&class| class as u16 >= lex.class_count) {
        return err(format!("byte {byte:#04x} maps to a missing class"));
    }
    let states = lex.state_count();
    if states == 0 || states >= DEAD_STATE as usize {
        return err(format!("state count {states} out of range"));
    }
    if lex.transitions.len() != states * lex.class_count as usize {
        return err("transition table has the wrong size".to_owned());
    }
    if let Some(&next) =
        lex.transitions.iter().find(|&&next| next != DEAD_STATE && next as usize >= states)
    {
        return err(format!("transition to missing state {next}"));
    }
    for accept in &lex.accept {
        if let LexAccept::Token(symbol) = *accept
            && (symbol.0 >= data.terminal_count || symbol == Symbol::END)
        {
            return err(format!("state accepts non-token symbol {}", symbol.0));
        }
    }
    if lex.modes.is_empty() {
        return err("no lex modes".to_owned());
    }
    if let Some(&mode) = lex.modes.iter().find(|&&mode| mode as usize >= states) {
        return err(format!("lex mode starts in missing state {mode}"));
    }
    Ok(())
}

fn validate_productions(data: &LanguageData) -> Result<(), LoadError> {
    let err = |reason: String| Err(LoadError::malformed("productions", reason));

    for (index, production) in data.productions.iter().enumerate() {
        if production.lhs.index() >= data.symbols.len()
            || data.symbol_kind(production.lhs) != SymbolKind::NonTerminal
        {
            return err(format!("production {index} reduces to non-symbol {}", production.lhs.0));
        }
        for &(child, field) in &production.fields {
            if child >= production.child_count {
                return err(format!("production {index} names missing child {child}"));
            }
            if field.get() as usize > data.field_names.len() {
                return err(format!("production {index} uses missing field {}", field.get()));
            }
        }
    }
    Ok(())
}

fn validate_parse_table(data: &LanguageData) -> Result<(), LoadError> {
    let err = |reason: String| Err(LoadError::malformed("parse table", reason));
    let parse = &data.parse;
    let states = parse.state_count as usize;
    let symbols = data.symbols.len();

    if states == 0 {
        return err("no parse states".to_owned());
    }
    if parse.lex_modes.len() != states {
        return err("lex mode table has the wrong size".to_owned());
    }
    if let Some(&mode) = parse.lex_modes.iter().find(|&&mode| mode as usize >= data.lex.modes.len())
    {
        return err(format!("state uses missing lex mode {mode}"));
    }
    if parse.action_lists.first().is_none_or(|list| !list.is_empty()) {
        return err("action list 0 must exist and be empty".to_owned());
    }
    if parse.cells.len() != states * symbols {
        return err("cell table has the wrong size".to_owned());
    }

    for (cell, &list) in parse.cells.iter().enumerate() {
        let Some(actions) = parse.action_lists.get(list as usize) else {
            return err(format!("cell {cell} references missing action list {list}"));
        };
        let symbol = Symbol((cell % symbols) as u16);
        let terminal = data.symbol_kind(symbol) == SymbolKind::Terminal;
        for action in actions {
            let valid = match *action {
                ParseAction::Shift(state) => terminal && state.index() < states,
                ParseAction::Goto(state) => !terminal && state.index() < states,
                ParseAction::Reduce(production) => {
                    terminal && production.index() < data.productions.len()
                }
                ParseAction::Accept => symbol == Symbol::END,
            };
            if !valid {
                return err(format!(
                    "state {} has invalid action {action:?} on symbol {}",
                    cell / symbols,
                    symbol.0
                ));
            }
        }
    }
    Ok(())
}
