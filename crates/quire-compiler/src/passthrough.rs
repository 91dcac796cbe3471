//! Compiler for sources that are already HTML or plain text.

use quire_core::{PRIORITY_LATE, RawOptions};

use crate::{CompileError, Compiler, escape_html};

/// Copies HTML through unchanged and wraps plain text in `<pre>`.
///
/// Partials (files starting with `_`) are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughCompiler;

impl Compiler for PassThroughCompiler {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn priority(&self) -> i32 {
        PRIORITY_LATE
    }

    fn source_extensions(&self) -> &[&str] {
        &["html", "htm", "txt"]
    }

    fn output_extension(&self) -> &str {
        "html"
    }

    fn ignored_patterns(&self) -> &[&str] {
        &["^_"]
    }

    fn compile(
        &self,
        extension: &str,
        input: &str,
        _data: &RawOptions,
    ) -> Result<String, CompileError> {
        if extension.eq_ignore_ascii_case("txt") {
            return Ok(format!("<pre>{}</pre>", escape_html(input)));
        }
        Ok(input.to_string())
    }
}
