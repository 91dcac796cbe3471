//! Build command - runs the full pipeline

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr, bail};
use quire_core::Config;
use quire_generator::{Pipeline, RunSummary};

/// Run the build command.
pub fn run(config_path: &Path, output: Option<&Path>, base_url: Option<&str>) -> Result<()> {
    run_with(config_path, false, output, base_url)
}

/// Run the build command, optionally layering environment overrides.
pub fn run_with(
    config_path: &Path,
    env: bool,
    output: Option<&Path>,
    base_url: Option<&str>,
) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_path, ?output, ?base_url, "Starting build");

    let mut config = super::load_config(config_path, env)?;
    apply_overrides(&mut config, output, base_url);
    tracing::debug!(?config, "Loaded configuration");

    let summary = Pipeline::with_defaults(config)
        .wrap_err("Failed to set up pipeline")?
        .run()
        .wrap_err("Build failed")?;

    print_summary(&summary, start.elapsed().as_secs_f64());

    if !summary.is_success() {
        bail!("Build finished with {} failure(s)", summary.failures.len());
    }

    tracing::info!(pages = summary.pages, written = summary.written, "Build completed successfully");
    Ok(())
}

fn apply_overrides(config: &mut Config, output: Option<&Path>, base_url: Option<&str>) {
    if let Some(dir) = output {
        tracing::info!(output = %dir.display(), "Overriding output directory from CLI");
        config.set_output_dir(dir);
    }
    if let Some(url) = base_url {
        tracing::info!(base_url = url, "Overriding base URL from CLI");
        config.set_base_url(url);
    }
}

fn print_summary(summary: &RunSummary, seconds: f64) {
    println!();
    if summary.is_success() {
        println!("  Build completed successfully!");
    } else {
        println!("  Build completed with failures:");
        for failure in &summary.failures {
            println!("  ✗ {failure}");
        }
    }
    println!();
    println!("  Pages:       {}", summary.pages);
    println!("  Written:     {}", summary.written);
    println!("  Collections: {}", summary.collections);
    println!();
    println!("  Duration:    {seconds:.2}s");
    println!();
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_build_writes_site() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resources = dir.path().join("resources");
        fs::create_dir_all(resources.join("pages")).expect("mkdir");
        fs::write(resources.join("pages/index.md"), "# Home\n").expect("write page");

        let config_path = dir.path().join("quire.toml");
        fs::write(
            &config_path,
            format!(
                "[site]\ntheme = \"default\"\nresources_dir = \"{}\"\n",
                resources.display()
            ),
        )
        .expect("write config");

        let output = dir.path().join("public");
        run(&config_path, Some(output.as_path()), Some("https://example.com")).expect("build");

        assert!(output.join("index.html").exists());
        let sitemap = fs::read_to_string(output.join("sitemap.xml")).expect("sitemap");
        assert!(sitemap.contains("<loc>https://example.com/</loc>"));
    }

    #[test]
    fn test_build_without_output_dir_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("quire.toml");
        fs::write(&config_path, "[site]\ntheme = \"default\"\n").expect("write config");

        let err = run(&config_path, None, None).unwrap_err();
        assert!(format!("{err:?}").contains("no output directory configured"));
    }
}
