//! Describe command - print the options every generator accepts

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use quire_core::Config;
use quire_generator::Pipeline;

/// Run the describe command.
///
/// Without a readable config file the built-in generators are described
/// with empty site data.
pub fn run(config_path: &Path, generator: Option<&str>, json: bool) -> Result<()> {
    run_with(config_path, false, generator, json)
}

/// Run the describe command, optionally layering environment overrides.
pub fn run_with(config_path: &Path, env: bool, generator: Option<&str>, json: bool) -> Result<()> {
    let config = if config_path.exists() {
        super::load_config(config_path, env)?
    } else {
        tracing::debug!(?config_path, "No configuration file, describing defaults");
        Config::from_data(Default::default()).wrap_err("Failed to build default configuration")?
    };

    let pipeline = Pipeline::with_defaults(config).wrap_err("Failed to set up pipeline")?;
    let mut described = pipeline.describe_generators();
    if let Some(key) = generator {
        described.retain(|(k, _)| k == key);
        if described.is_empty() {
            bail!("No generator with key '{key}'");
        }
    }

    if json {
        let descriptions: Vec<_> = described.iter().map(|(_, d)| d).collect();
        println!("{}", serde_json::to_string_pretty(&descriptions)?);
        return Ok(());
    }

    for (key, description) in &described {
        println!("{} ({key})", description.name);
        if !description.description.is_empty() {
            println!("{}", description.description);
        }
        println!();
        println!("{}", description.table());
        if !description.archetypes.is_empty() {
            println!("Archetypes:");
            for archetype in &description.archetypes {
                println!("  {} ({}): {}", archetype.key, archetype.name, archetype.description);
            }
        }
        println!();
    }

    Ok(())
}
