//! Raw descriptor tables.
//!
//! These are the decoded contents of a descriptor. They are public so that a
//! grammar compiler can fill them in and encode them, but the engine only ever
//! sees them through a validated [`Language`](crate::Language).

use crate::{FieldId, ProductionId, StateId, Symbol, SymbolInfo, SymbolKind};

/// Marker for "no transition" in [`LexTable::transitions`].
pub const DEAD_STATE: u16 = u16::MAX;

/// What a lexer state accepts when the automaton stops in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexAccept {
    None,
    /// Whitespace and other bytes that never become tokens.
    Skip,
    Token(Symbol),
}

impl LexAccept {
    const NONE: u16 = u16::MAX;
    const SKIP: u16 = u16::MAX - 1;

    pub(crate) fn encode(self) -> u16 {
        match self {
            Self::None => Self::NONE,
            Self::Skip => Self::SKIP,
            Self::Token(symbol) => symbol.0,
        }
    }

    pub(crate) fn decode(raw: u16) -> Self {
        match raw {
            Self::NONE => Self::None,
            Self::SKIP => Self::Skip,
            raw => Self::Token(Symbol(raw)),
        }
    }
}

/// Byte-class DFA shared by every lex mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexTable {
    pub byte_classes: [u8; 256],
    pub class_count: u16,
    pub accept: Vec<LexAccept>,
    /// `transitions[state * class_count + class]`, [`DEAD_STATE`] when absent.
    pub transitions: Vec<u16>,
    /// Start state of every lex mode.
    pub modes: Vec<u16>,
}

impl LexTable {
    pub fn state_count(&self) -> usize {
        self.accept.len()
    }

    #[inline]
    pub fn next_state(&self, state: u16, byte: u8) -> Option<u16> {
        let class = self.byte_classes[byte as usize] as usize;
        let next = self.transitions[state as usize * self.class_count as usize + class];
        (next != DEAD_STATE).then_some(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParseAction {
    Shift(StateId),
    Reduce(ProductionId),
    Goto(StateId),
    Accept,
}

impl ParseAction {
    pub(crate) const SHIFT: u8 = 0;
    pub(crate) const REDUCE: u8 = 1;
    pub(crate) const GOTO: u8 = 2;
    pub(crate) const ACCEPT: u8 = 3;
}

/// State × symbol action table. Cells index `action_lists`; list 0 is the
/// empty (error) list. A list with more than one action is a declared
/// conflict that the parser explores by forking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTable {
    pub state_count: u16,
    pub cells: Vec<u32>,
    pub action_lists: Vec<Vec<ParseAction>>,
    /// Lex mode used when the parser is in each state.
    pub lex_modes: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: Symbol,
    pub child_count: u16,
    pub dynamic_precedence: i16,
    /// `(child index, field)` pairs, sorted by child index.
    pub fields: Vec<(u16, FieldId)>,
}

impl Production {
    pub fn field_for_child(&self, child: u16) -> Option<FieldId> {
        self.fields.iter().find(|(index, _)| *index == child).map(|&(_, field)| field)
    }
}

/// How the parser ranks competing complete interpretations when the table
/// holds a declared conflict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AmbiguityPolicy {
    /// Highest accumulated dynamic precedence wins; ties go to the
    /// interpretation that followed the first-listed action.
    #[default]
    DynamicPrecedence,
    /// The interpretation that followed the first-listed action at every fork
    /// wins.
    FirstAction,
}

impl AmbiguityPolicy {
    pub(crate) fn encode(self) -> u8 {
        match self {
            Self::DynamicPrecedence => 0,
            Self::FirstAction => 1,
        }
    }

    pub(crate) fn decode(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::DynamicPrecedence),
            1 => Some(Self::FirstAction),
            _ => None,
        }
    }
}

/// The decoded descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageData {
    pub version: u16,
    pub name: String,
    pub symbols: Vec<SymbolInfo>,
    pub terminal_count: u16,
    /// Field names; `FieldId(n)` names `field_names[n - 1]`.
    pub field_names: Vec<String>,
    pub lex: LexTable,
    pub parse: ParseTable,
    pub productions: Vec<Production>,
    pub ambiguity: AmbiguityPolicy,
}

impl LanguageData {
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol_kind(&self, symbol: Symbol) -> SymbolKind {
        if symbol.0 < self.terminal_count || symbol == Symbol::ERROR {
            SymbolKind::Terminal
        } else {
            SymbolKind::NonTerminal
        }
    }

    pub fn cell(&self, state: StateId, symbol: Symbol) -> usize {
        state.index() * self.symbols.len() + symbol.index()
    }
}
