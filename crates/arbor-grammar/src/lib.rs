//! Compiled grammar descriptors: the binary format, its loader and the
//! validated [`Language`] handle the lexer and parser are configured from.

mod codec;
mod error;
mod language;
pub mod tables;
mod symbol;
mod validate;
#[cfg(test)]
mod tests;

pub use error::LoadError;
pub use language::Language;
pub use symbol::{FieldId, ProductionId, StateId, Symbol, SymbolInfo, SymbolKind};
pub use tables::{AmbiguityPolicy, LanguageData, LexAccept, ParseAction, Production};

/// Leading bytes of every descriptor.
pub const MAGIC: [u8; 4] = *b"ARBR";
/// ABI version written by this crate.
pub const LANGUAGE_VERSION: u16 = 3;
/// Oldest ABI version this crate still loads.
pub const MIN_COMPATIBLE_LANGUAGE_VERSION: u16 = 1;
