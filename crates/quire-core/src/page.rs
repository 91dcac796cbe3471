//! Index entries produced by generators.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RawOptions;

/// A page recorded in the site index.
///
/// The identity of a page (`name`, `url`, `path`) is fixed at construction so
/// that cross-links resolved against the index stay valid while pages render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    name: String,
    url: String,
    path: String,
    generator: String,

    /// Source file the page is built from.
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Layout requested by the page itself; wins over the generator layout.
    #[serde(default)]
    pub layout: Option<String>,

    /// Short description for meta tags and listings.
    #[serde(default)]
    pub description: Option<String>,

    /// Last modification time, used for sitemaps.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,

    /// Free-form data made available to layouts.
    #[serde(default)]
    pub data: RawOptions,
}

impl Page {
    /// Create a page written to `path` (relative to the output directory).
    ///
    /// The absolute URL is derived from `base_url`; `about/index.html` is
    /// addressed as `{base_url}/about/`.
    pub fn new(
        name: impl Into<String>,
        generator: impl Into<String>,
        path: impl Into<String>,
        base_url: &str,
    ) -> Self {
        let path = normalize_path(&path.into());
        let url = url_for_path(base_url, &path);
        Self {
            name: name.into(),
            url,
            path,
            generator: generator.into(),
            source: None,
            layout: None,
            description: None,
            updated: None,
            data: RawOptions::new(),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Output path relative to the output directory, `/`-separated.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Key of the generator that indexed this page.
    pub fn generator(&self) -> &str {
        &self.generator
    }

    /// Extension of the output file, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.path).extension().and_then(|e| e.to_str())
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }
}

/// Output path for a source file relative to its base directory.
///
/// Pages get pretty URLs:
/// - `about.md` → `about/index.html`
/// - `docs/index.md` → `docs/index.html`
/// - `index.md` → `index.html`
pub fn pretty_path(relative_source: &Path, output_extension: &str) -> String {
    let stem = relative_source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let parent = relative_source
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    let mut segments: Vec<String> = Vec::new();
    if !parent.is_empty() {
        segments.push(parent);
    }
    if stem != "index" && !stem.is_empty() {
        segments.push(stem);
    }
    segments.push(format!("index.{output_extension}"));
    segments.join("/")
}

/// Relative `/`-separated form of `path`.
///
/// `..` is resolved lexically and never climbs above the output root.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn url_for_path(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let pretty = match path.strip_suffix("index.html") {
        Some(dir) => dir,
        None => path,
    };
    format!("{base}/{pretty}")
}
