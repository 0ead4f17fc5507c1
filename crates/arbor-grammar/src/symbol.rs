use std::fmt;
use std::num::NonZeroU16;

/// Grammar symbol id. Terminals come first, non-terminals after them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(pub u16);

impl Symbol {
    /// End of input. Always terminal 0.
    pub const END: Self = Self(0);
    /// Builtin error symbol. Never stored in the tables.
    pub const ERROR: Self = Self(u16::MAX);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ERROR { f.write_str("ERROR") } else { write!(f, "#{}", self.0) }
    }
}

/// Parse state id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u16);

impl StateId {
    pub const START: Self = Self(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into the production table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionId(pub u16);

impl ProductionId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Field name id. Id 0 is reserved for "no field", so the type is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub NonZeroU16);

impl FieldId {
    pub const fn new(raw: u16) -> Option<Self> {
        match NonZeroU16::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    #[inline]
    pub const fn get(self) -> u16 {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    NonTerminal,
}

/// Per-symbol metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: String,
    /// Named symbols come from named rules; anonymous ones are literal tokens.
    pub named: bool,
    /// Hidden symbols are flattened into their parent.
    pub visible: bool,
    /// Extras may appear between any two tokens.
    pub extra: bool,
}

impl SymbolInfo {
    pub fn new(name: impl Into<String>, named: bool, visible: bool) -> Self {
        Self { name: name.into(), named, visible, extra: false }
    }

    pub(crate) const NAMED: u8 = 1 << 0;
    pub(crate) const VISIBLE: u8 = 1 << 1;
    pub(crate) const EXTRA: u8 = 1 << 2;

    pub(crate) fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.named {
            flags |= Self::NAMED;
        }
        if self.visible {
            flags |= Self::VISIBLE;
        }
        if self.extra {
            flags |= Self::EXTRA;
        }
        flags
    }

    pub(crate) fn from_flags(name: String, flags: u8) -> Self {
        Self {
            name,
            named: flags & Self::NAMED != 0,
            visible: flags & Self::VISIBLE != 0,
            extra: flags & Self::EXTRA != 0,
        }
    }
}
