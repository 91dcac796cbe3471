//! Quire CLI Library
//!
//! Command implementations for the `quire` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, check, describe)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use quire::cmd;
//!
//! cmd::build::run(Path::new("quire.toml"), None, None).unwrap();
//! ```

pub mod cmd;

pub use quire_core::{Config, Page};
pub use quire_generator::{Pipeline, RunSummary};

/// Initialize tracing with the specified verbosity level.
///
/// `RUST_LOG` directives are honoured on top of the level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
