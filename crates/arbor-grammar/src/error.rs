use thiserror::Error;

/// Errors raised while loading a grammar descriptor.
///
/// Both variants are fatal for the descriptor: no handle is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The ABI tag lies outside the range this host understands.
    #[error("incompatible grammar version {version}, supported range is {min}..={max}")]
    IncompatibleVersion { version: u16, min: u16, max: u16 },

    /// The descriptor is truncated, corrupt, or references something out of
    /// range.
    #[error("malformed grammar table in {section}: {reason}")]
    MalformedTable { section: &'static str, reason: String },
}

impl LoadError {
    pub(crate) fn malformed(section: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedTable { section, reason: reason.into() }
    }
}
