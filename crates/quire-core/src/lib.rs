//! Quire Core Library
//!
//! Core types, configuration, and error handling shared by the Quire pipeline crates.

pub mod config;
pub mod error;
pub mod frontmatter;
pub mod page;
pub mod priority;

pub use config::{Config, SiteConfig};
pub use error::{CoreError, Result};
pub use page::{Page, pretty_path};
pub use priority::{PRIORITY_DEFAULT, PRIORITY_EARLY, PRIORITY_INIT, PRIORITY_LATE, priority_order};

/// Raw, loosely-typed option data as handed to plugins.
pub type RawOptions = serde_json::Map<String, serde_json::Value>;
