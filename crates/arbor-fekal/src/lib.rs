//! The `fekal` seccomp-policy grammar.
//!
//! The descriptor is compiled from the grammar in `build.rs` and embedded in
//! the crate; [`language`] loads it on first use.

use arbor_grammar::{Language, LoadError};
use once_cell::sync::Lazy;

/// Descriptor bytes of the bundled grammar.
pub static DESCRIPTOR: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/fekal.bin"));

static LANGUAGE: Lazy<Result<Language, LoadError>> = Lazy::new(|| Language::load(DESCRIPTOR));

/// The loaded grammar, or why the embedded descriptor was rejected.
pub fn try_language() -> Result<&'static Language, &'static LoadError> {
    Lazy::force(&LANGUAGE).as_ref()
}

/// Every call returns the same handle.
pub fn language() -> &'static Language {
    match try_language() {
        Ok(language) => language,
        Err(error) => panic!("bundled fekal descriptor failed to load: {error}"),
    }
}
