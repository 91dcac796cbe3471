//! Themes own the layouts pages are rendered into.

use std::collections::HashMap;

use quire_core::RawOptions;
use serde_json::Value;

use crate::template::Template;

/// A set of layouts plus the site options they rely on.
pub trait Theme: Send + Sync {
    /// Key used by `site.theme` and generator `theme` overrides.
    fn key(&self) -> &str;

    /// Dotted paths into the site data this theme reads, e.g. `site.base_url`.
    fn required_options(&self) -> &[&str] {
        &[]
    }

    fn layout(&self, name: &str) -> Option<&Template>;

    /// Layout used when neither a page nor its generator picks one.
    fn default_layout(&self) -> &str {
        "page"
    }

    /// Required options absent from `site`, in declaration order.
    ///
    /// Null and empty-string values count as absent.
    fn missing_options(&self, site: &RawOptions) -> Vec<String> {
        self.required_options()
            .iter()
            .filter(|path| !is_present(site, path))
            .map(|path| path.to_string())
            .collect()
    }
}

fn is_present(site: &RawOptions, path: &str) -> bool {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return false;
    };
    let mut current = site.get(first);
    for segment in segments {
        current = current.and_then(|v| v.get(segment));
    }
    match current {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// The built-in theme: a minimal HTML page.
#[derive(Debug, Clone)]
pub struct DefaultTheme {
    layouts: HashMap<String, Template>,
}

impl Default for DefaultTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultTheme {
    pub fn new() -> Self {
        let mut theme = Self {
            layouts: HashMap::new(),
        };
        theme.add_layout(Template::new("page", DEFAULT_PAGE_LAYOUT));
        theme.add_layout(Template::new("bare", "{{ content }}"));
        theme
    }

    /// Add or replace a layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Template) -> Self {
        self.add_layout(layout);
        self
    }

    fn add_layout(&mut self, layout: Template) {
        self.layouts.insert(layout.name().to_string(), layout);
    }
}

impl Theme for DefaultTheme {
    fn key(&self) -> &str {
        "default"
    }

    fn layout(&self, name: &str) -> Option<&Template> {
        self.layouts.get(name)
    }
}

/// Page layout of the default theme.
pub const DEFAULT_PAGE_LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{{ title }} | {{ site_title }}</title>
    <meta name="description" content="{{ description? }}">
    <link rel="canonical" href="{{ url }}">
</head>
<body>
    <main>
        <article>
            <h1>{{ title }}</h1>
{{ content }}
        </article>
    </main>
</body>
</html>
"#;
