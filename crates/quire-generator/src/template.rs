//! Layout rendering.
//!
//! Layouts use plain string interpolation: `{{ name }}` is replaced by a
//! context variable and `{{ name? }}` by the variable or nothing.

use std::collections::HashMap;

use thiserror::Error;

use crate::theme::Theme;

/// Template rendering errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("missing required variable: {0}")]
    MissingVariable(String),

    #[error("theme '{theme}' has no layout '{layout}'")]
    LayoutNotFound { theme: String, layout: String },

    #[error("invalid template syntax: {0}")]
    InvalidSyntax(String),
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Variables available to a layout.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    variables: HashMap<String, String>,
}

impl TemplateContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }
}

/// A named layout.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    content: String,
}

impl Template {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace every placeholder with its value from `context`.
    ///
    /// Substituted values are never rescanned for placeholders.
    pub fn render(&self, context: &TemplateContext) -> Result<String> {
        let mut result = self.content.clone();
        let mut pos = 0;

        while let Some(start) = result[pos..].find("{{") {
            let start = pos + start;
            let end = result[start..]
                .find("}}")
                .ok_or_else(|| TemplateError::InvalidSyntax("unclosed {{ delimiter".to_string()))?;
            let end = start + end + 2;

            let var_name = result[start + 2..end - 2].trim();
            let (var_name, optional) = match var_name.strip_suffix('?') {
                Some(stripped) => (stripped.trim(), true),
                None => (var_name, false),
            };

            let value = match context.get(var_name) {
                Some(v) => v.to_string(),
                None if optional => String::new(),
                None => return Err(TemplateError::MissingVariable(var_name.to_string())),
            };

            result.replace_range(start..end, &value);
            pos = start + value.len();
        }

        Ok(result)
    }
}

/// Renders page content into a theme layout.
pub trait Renderer: Send + Sync {
    /// Render `layout` of `theme`; `None` selects the theme's default layout.
    fn render(
        &self,
        theme: &dyn Theme,
        layout: Option<&str>,
        context: &TemplateContext,
    ) -> Result<String>;
}

/// Looks layouts up on the theme and interpolates them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutRenderer;

impl Renderer for LayoutRenderer {
    fn render(
        &self,
        theme: &dyn Theme,
        layout: Option<&str>,
        context: &TemplateContext,
    ) -> Result<String> {
        let name = layout.unwrap_or_else(|| theme.default_layout());
        let template = theme
            .layout(name)
            .ok_or_else(|| TemplateError::LayoutNotFound {
                theme: theme.key().to_string(),
                layout: name.to_string(),
            })?;
        template.render(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::DefaultTheme;

    #[test]
    fn test_template_simple_render() {
        let template = Template::new("test", "Hello, {{ name }}!");
        let ctx = TemplateContext::new().with_var("name", "World");

        assert_eq!(template.render(&ctx).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_template_multiple_variables() {
        let template = Template::new("test", "{{ greeting }}, {{ name }}! Welcome to {{ place }}.");
        let ctx = TemplateContext::new()
            .with_var("greeting", "Hello")
            .with_var("name", "Alice")
            .with_var("place", "Wonderland");

        assert_eq!(
            template.render(&ctx).unwrap(),
            "Hello, Alice! Welcome to Wonderland."
        );
    }

    #[test]
    fn test_template_optional_variable() {
        let template = Template::new("test", "Hello{{ suffix? }}!");

        assert_eq!(template.render(&TemplateContext::new()).unwrap(), "Hello!");
        let ctx = TemplateContext::new().with_var("suffix", ", World");
        assert_eq!(template.render(&ctx).unwrap(), "Hello, World!");
    }

    #[test]
    fn test_template_missing_required_variable() {
        let template = Template::new("test", "Hello, {{ name }}!");
        let result = template.render(&TemplateContext::new());

        assert_eq!(result, Err(TemplateError::MissingVariable("name".into())));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = Template::new("test", "{{ content }}");
        let ctx = TemplateContext::new().with_var("content", "{{ raw }}");

        assert_eq!(template.render(&ctx).unwrap(), "{{ raw }}");
    }

    #[test]
    fn test_unclosed_delimiter() {
        let template = Template::new("test", "Hello {{ name");
        assert!(matches!(
            template.render(&TemplateContext::new()),
            Err(TemplateError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_layout_renderer_uses_default_layout() {
        let ctx = TemplateContext::new()
            .with_var("title", "About")
            .with_var("site_title", "Docs")
            .with_var("url", "https://example.com/about/")
            .with_var("content", "<p>Hi</p>");

        let html = LayoutRenderer.render(&DefaultTheme::new(), None, &ctx).unwrap();
        assert!(html.contains("<title>About | Docs</title>"));
        assert!(html.contains("<p>Hi</p>"));
    }

    #[test]
    fn test_layout_renderer_unknown_layout() {
        let result =
            LayoutRenderer.render(&DefaultTheme::new(), Some("missing"), &TemplateContext::new());
        assert_eq!(
            result,
            Err(TemplateError::LayoutNotFound {
                theme: "default".into(),
                layout: "missing".into(),
            })
        );
    }
}
