//! Error types for option binding.

use thiserror::Error;

/// Result type for fatal option errors.
pub type Result<T> = std::result::Result<T, OptionsError>;

/// Fatal configuration errors. Binding stops before any field is extracted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    /// An archetype chain refers back to a type already on the chain.
    #[error("archetype cycle while configuring {holder}: {}", chain.join(" -> "))]
    ArchetypeCycle { holder: String, chain: Vec<String> },

    /// Two options declared directly on the same type share a key.
    #[error("duplicate option key '{key}' declared on {holder}")]
    DuplicateKey { holder: String, key: String },
}

/// A raw value that could not be converted to a field's declared type.
///
/// Recorded against the holder; the field keeps its language default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("option '{key}' of {holder}: {message}")]
pub struct ExtractionError {
    pub holder: String,
    pub key: String,
    pub message: String,
}

/// A holder that did not pass validation after binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{holder} did not pass validation: {reason}")]
pub struct ValidationError {
    pub holder: String,
    pub reason: String,
}

/// Failure raised while converting a single value.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The raw value has the wrong shape for the declared type.
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },

    /// A nested holder hit a fatal configuration error.
    #[error(transparent)]
    Fatal(#[from] OptionsError),
}

impl ConvertError {
    /// Create a type mismatch error.
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::Mismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
