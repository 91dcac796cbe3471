//! Site configuration management.
//!
//! A site is configured by a single TOML document. The `[site]` table is read
//! into [`SiteConfig`]; the whole document is also kept as raw data so that
//! plugins can bind their own options from it (a generator with key `pages`
//! reads the `[pages]` table, archetypes read tables such as `[allGenerators]`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    RawOptions,
    error::{CoreError, Result},
};

/// Main configuration structure for Quire.
#[derive(Debug, Clone)]
pub struct Config {
    /// Site-wide settings.
    pub site: SiteConfig,

    /// The complete configuration document, including `[site]`.
    data: RawOptions,
}

/// Site-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Base URL for the site (e.g., "https://example.com").
    #[serde(default)]
    pub base_url: String,

    /// Output directory for generated files. Required before a run may start.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Directory holding source resources read by generators.
    #[serde(default = "default_resources_dir")]
    pub resources_dir: PathBuf,

    /// Key of the theme used to render pages. Required before a run may start.
    #[serde(default)]
    pub theme: Option<String>,

    /// Size of the worker pool used by parallel generators.
    #[serde(default)]
    pub workers: Option<usize>,
}

fn default_title() -> String {
    "Quire Site".to_string()
}

fn default_resources_dir() -> PathBuf {
    PathBuf::from("resources")
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            base_url: String::new(),
            output_dir: None,
            resources_dir: default_resources_dir(),
            theme: None,
            workers: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let document: Value = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        Self::from_value(document)
    }

    /// Load configuration using the config crate, layering `QUIRE__` environment variables.
    ///
    /// `QUIRE__SITE__OUTPUT_DIR=dist` overrides `site.output_dir`.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("QUIRE").separator("__"))
            .build()?;

        let document: Value = settings.try_deserialize()?;
        Self::from_value(document)
    }

    /// Build a configuration from an already parsed document.
    pub fn from_value(document: Value) -> Result<Self> {
        let Value::Object(data) = document else {
            return Err(CoreError::config("configuration root must be a table"));
        };
        Self::from_data(data)
    }

    /// Build a configuration from raw data.
    pub fn from_data(data: RawOptions) -> Result<Self> {
        let site: SiteConfig = match data.get("site") {
            Some(site) => serde_json::from_value(site.clone())
                .map_err(|e| CoreError::config_with_source("invalid [site] table", e))?,
            None => SiteConfig::default(),
        };

        let config = Self { site, data };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Missing output directory or theme are not rejected here; a run decides that.
    fn validate(&self) -> Result<()> {
        if self.site.title.is_empty() {
            return Err(CoreError::config("site.title cannot be empty"));
        }

        if self.site.workers == Some(0) {
            return Err(CoreError::config("site.workers must be at least 1"));
        }

        if self.site.base_url.ends_with('/') {
            tracing::warn!("site.base_url should not have a trailing slash");
        }

        Ok(())
    }

    /// The complete raw configuration document.
    pub fn data(&self) -> &RawOptions {
        &self.data
    }

    /// The table stored under `key`, or an empty map.
    pub fn section(&self, key: &str) -> RawOptions {
        match self.data.get(key) {
            Some(Value::Object(map)) => map.clone(),
            _ => RawOptions::new(),
        }
    }

    /// Override the output directory, keeping the raw data in sync.
    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        self.site_table()
            .insert("output_dir".into(), Value::String(dir.display().to_string()));
        self.site.output_dir = Some(dir);
    }

    /// Override the base URL, keeping the raw data in sync.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        let base_url = base_url.into();
        self.site_table()
            .insert("base_url".into(), Value::String(base_url.clone()));
        self.site.base_url = base_url;
    }

    fn site_table(&mut self) -> &mut RawOptions {
        let site = self
            .data
            .entry("site")
            .or_insert_with(|| Value::Object(RawOptions::new()));
        if !site.is_object() {
            *site = Value::Object(RawOptions::new());
        }
        match site {
            Value::Object(map) => map,
            _ => unreachable!("site table was just normalised to an object"),
        }
    }

    /// Get the full URL for a path.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.site.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}
