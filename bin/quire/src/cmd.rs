//! CLI commands.

pub mod build;
pub mod check;
pub mod describe;

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use quire_core::Config;

/// Load the site configuration.
///
/// With `env`, `QUIRE__SECTION__KEY` environment variables override the file.
pub(crate) fn load_config(path: &Path, env: bool) -> Result<Config> {
    let config = if env {
        Config::load_with_env(path)
    } else {
        Config::load(path)
    };
    config.wrap_err_with(|| format!("Failed to load configuration from {}", path.display()))
}
