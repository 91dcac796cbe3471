//! Syntax highlighting for fenced code blocks.

use std::sync::LazyLock;

use syntect::{highlighting::ThemeSet, html::highlighted_html_for_string, parsing::SyntaxSet};

use crate::escape_html;

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Theme used when none is configured.
pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Highlights code with syntect, falling back to an escaped `<pre><code>` block.
///
/// Syntax and theme sets are loaded once per process and shared by every
/// highlighter.
#[derive(Debug, Clone)]
pub struct SyntaxHighlighter {
    theme: String,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
        }
    }
}

impl SyntaxHighlighter {
    /// A highlighter using `theme`, or `None` if syntect has no such theme.
    pub fn with_theme(theme: &str) -> Option<Self> {
        THEMES.themes.contains_key(theme).then(|| Self {
            theme: theme.to_string(),
        })
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Names of every bundled theme.
    pub fn themes() -> Vec<&'static str> {
        THEMES.themes.keys().map(String::as_str).collect()
    }

    /// Highlight `code` written in `lang`.
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let syntax = lang.and_then(|l| SYNTAXES.find_syntax_by_token(l));
        let theme = THEMES.themes.get(&self.theme);

        if let (Some(syntax), Some(theme)) = (syntax, theme)
            && let Ok(html) = highlighted_html_for_string(code, &SYNTAXES, syntax, theme)
        {
            return html;
        }

        let class = lang
            .map(|l| format!(" class=\"language-{}\"", escape_html(l)))
            .unwrap_or_default();
        format!("<pre><code{class}>{}</code></pre>", escape_html(code))
    }
}
