//! Frontmatter parsing for content files.
//!
//! Frontmatter is returned as raw option data; callers bind it onto typed
//! holders through the options engine.

use std::path::Path;

use serde_json::Value;

use crate::{
    RawOptions,
    error::{CoreError, Result},
};

/// Delimiter types for frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML frontmatter delimited by `---`.
    Yaml,
    /// TOML frontmatter delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Split content into frontmatter and body.
pub fn split_frontmatter(content: &str) -> Option<(FrontmatterFormat, &str, &str)> {
    let content = content.trim_start();

    let format = if content.starts_with("---") {
        FrontmatterFormat::Yaml
    } else if content.starts_with("+++") {
        FrontmatterFormat::Toml
    } else {
        return None;
    };

    let delimiter = format.delimiter();

    let after_first = &content[delimiter.len()..];
    let closing_pos = after_first.find(delimiter)?;

    let frontmatter = after_first[..closing_pos].trim();
    let body = after_first[closing_pos + delimiter.len()..].trim_start();

    Some((format, frontmatter, body))
}

/// Parse frontmatter from a string into raw data and body.
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<(RawOptions, String)> {
    let Some((format, fm_str, body)) = split_frontmatter(content) else {
        return Ok((RawOptions::new(), content.to_string()));
    };

    if fm_str.is_empty() {
        return Ok((RawOptions::new(), body.to_string()));
    }

    let value: Value = match format {
        FrontmatterFormat::Yaml => {
            serde_yaml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
        FrontmatterFormat::Toml => {
            toml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
    };

    match value {
        Value::Object(data) => Ok((data, body.to_string())),
        Value::Null => Ok((RawOptions::new(), body.to_string())),
        _ => Err(CoreError::frontmatter(path, "frontmatter must be a mapping")),
    }
}
