//! Check command - validate configuration and generator options without writing output

use std::path::Path;

use color_eyre::eyre::{Result, bail};
use quire_generator::Pipeline;

/// Validation result.
#[derive(Debug, Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Loads the configuration, runs the sanity check and indexes every
/// generator. Nothing is written.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    run_with(config_path, false, strict)
}

/// Run the check command, optionally layering environment overrides.
pub fn run_with(config_path: &Path, env: bool, strict: bool) -> Result<()> {
    tracing::info!(?config_path, env, strict, "Checking configuration");

    let mut result = ValidationResult::default();
    check(config_path, env, &mut result);

    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");
    Ok(())
}

fn check(config_path: &Path, env: bool, result: &mut ValidationResult) {
    println!("Checking configuration...");
    let config = match super::load_config(config_path, env) {
        Ok(config) => {
            println!("  ✓ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ✗ Configuration invalid");
            result.add_error(format!("{e:#}"));
            return;
        }
    };

    let pipeline = match Pipeline::with_defaults(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            result.add_error(e.to_string());
            return;
        }
    };

    println!("\nChecking required settings...");
    if let Err(e) = pipeline.sanity_check() {
        println!("  ✗ {e}");
        result.add_error(e.to_string());
        return;
    }
    println!("  ✓ Output directory and theme configured");

    println!("\nIndexing...");
    match pipeline.index() {
        Ok(indexed) => {
            println!("  ✓ {} page(s) indexed", indexed.index().len());
            for failure in indexed.failures() {
                result.add_warning(failure.to_string());
            }
        }
        Err(e) => {
            println!("  ✗ Indexing failed");
            result.add_error(e.to_string());
        }
    }
}
