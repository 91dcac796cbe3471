//! Quire CLI
//!
//! Binary entry point. Command implementations live in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Quire.
#[derive(Parser)]
#[command(
    name = "quire",
    version,
    about = "A plugin-driven site generator"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "quire.toml")]
    config: std::path::PathBuf,

    /// Layer QUIRE__SECTION__KEY environment variables over the config file
    #[arg(long, global = true)]
    env: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Index and generate the site
    Build {
        /// Output directory (overrides site.output_dir)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
        /// Override site base URL (e.g., https://example.com)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Validate configuration and generator options without writing output
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
    /// Describe the options of the registered generators
    Describe {
        /// Only describe the generator with this key
        generator: Option<String>,
        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    quire::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { output, base_url } => {
            quire::cmd::build::run_with(
                &cli.config,
                cli.env,
                output.as_deref(),
                base_url.as_deref(),
            )?;
        }
        Commands::Check { strict } => {
            quire::cmd::check::run_with(&cli.config, cli.env, strict)?;
        }
        Commands::Describe { generator, json } => {
            quire::cmd::describe::run_with(&cli.config, cli.env, generator.as_deref(), json)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_build_command_parsing() {
        let args = ["quire", "build", "--output", "dist"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, std::path::PathBuf::from("quire.toml"));
        assert_eq!(cli.verbose, 0);
        assert!(!cli.env);

        match cli.command {
            Commands::Build { output, base_url } => {
                assert_eq!(output, Some(std::path::PathBuf::from("dist")));
                assert!(base_url.is_none());
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_with_base_url() {
        let args = ["quire", "build", "--base-url", "https://example.com", "--env"];
        let cli = Cli::parse_from(args);

        assert!(cli.env);
        match cli.command {
            Commands::Build { output, base_url } => {
                assert!(output.is_none());
                assert_eq!(base_url.as_deref(), Some("https://example.com"));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_check_command_parsing() {
        let args = ["quire", "check", "--strict"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Check { strict } => assert!(strict),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_describe_command_parsing() {
        let args = ["quire", "describe", "sitemap", "--json"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Describe { generator, json } => {
                assert_eq!(generator.as_deref(), Some("sitemap"));
                assert!(json);
            }
            _ => panic!("Expected Describe command"),
        }
    }

    #[test]
    fn test_cli_verbosity_flags() {
        let args = ["quire", "-vvv", "build"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_cli_custom_config_path() {
        let args = ["quire", "--config", "site.toml", "check"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.config, std::path::PathBuf::from("site.toml"));
    }
}
