//! Quire Compiler Library
//!
//! Compilers turn source text into output text. Each compiler declares the
//! source extensions it handles, one output extension and optional ignore
//! patterns; the [`CompilerRegistry`] picks the highest-priority compiler for
//! a file.

pub mod markdown;
pub mod passthrough;
pub mod registry;
pub mod syntax;

pub use markdown::MarkdownCompiler;
pub use passthrough::PassThroughCompiler;
use quire_core::{PRIORITY_DEFAULT, RawOptions};
pub use registry::{Compiled, CompilerRegistry};
pub use syntax::SyntaxHighlighter;
use thiserror::Error;

/// A compiler failed on its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// No compiler could be chosen for a file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// No registered compiler lists the extension.
    #[error("no compiler handles '.{extension}' files")]
    NoCompiler { extension: String },

    /// Every compiler listing the extension ignores this file.
    #[error("'{file_name}' is ignored by every compiler for its extension")]
    Ignored { file_name: String },
}

/// Compiler errors.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// An ignore pattern is not a valid regex.
    #[error("compiler '{compiler}' has an invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        compiler: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The resolved compiler failed.
    #[error("compiler '{compiler}' failed: {source}")]
    Compile {
        compiler: String,
        #[source]
        source: CompileError,
    },
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, CompilerError>;

/// Turns source text into output text.
pub trait Compiler: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        PRIORITY_DEFAULT
    }

    /// Extensions (without dot) this compiler reads.
    fn source_extensions(&self) -> &[&str];

    /// Extension of everything this compiler produces.
    fn output_extension(&self) -> &str;

    /// Regexes matched against a file name; a match means this compiler skips the file.
    fn ignored_patterns(&self) -> &[&str] {
        &[]
    }

    /// Compile `input`, written in `extension`, with page `data` available.
    fn compile(
        &self,
        extension: &str,
        input: &str,
        data: &RawOptions,
    ) -> std::result::Result<String, CompileError>;
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("it's \"x\""), "it&#x27;s &quot;x&quot;");
    }

    #[test]
    fn test_resolution_error_display() {
        let err = ResolutionError::NoCompiler {
            extension: "adoc".into(),
        };
        assert_eq!(err.to_string(), "no compiler handles '.adoc' files");
    }
}
