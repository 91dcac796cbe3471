//! Error types for the generator pipeline.

use std::{fmt, path::PathBuf};

use quire_compiler::CompilerError;
use quire_core::CoreError;
use quire_options::OptionsError;
use thiserror::Error;

use crate::template::TemplateError;

/// Settings that must be valid before a run may start.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no output directory configured (set site.output_dir or pass --output)")]
    MissingOutputDir,

    #[error("no theme configured (set site.theme)")]
    MissingTheme,

    #[error("theme '{theme}' is not registered")]
    UnknownTheme { theme: String },

    #[error("generator #{position} has an empty key")]
    EmptyGeneratorKey { position: usize },

    #[error("theme '{theme}' requires options that could not be found: {}", missing.join(", "))]
    MissingThemeOptions { theme: String, missing: Vec<String> },

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Compiler(#[from] CompilerError),
}

/// A generator failed while indexing. Aborts the run.
#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two sources produce the same URL.
    #[error("'{url}' from {second} is already indexed by {first}")]
    DuplicateUrl {
        url: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error("{0}")]
    Other(String),
}

impl IndexingError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A page or generator failed while generating. Recorded, never fatal.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A write targeted a URL missing from the frozen index.
    #[error("'{url}' is not in the site index")]
    Unindexed { url: String },

    /// A page path that would resolve outside the output directory.
    #[error("'{path}' is outside the output directory")]
    OutsideOutput { path: String },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{0}")]
    Other(String),
}

impl GenerationError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Fatal pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("generator '{generator}' failed to index: {source}")]
    Indexing {
        generator: String,
        #[source]
        source: IndexingError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<OptionsError> for PipelineError {
    fn from(err: OptionsError) -> Self {
        Self::Configuration(ConfigurationError::Options(err))
    }
}

impl From<CompilerError> for PipelineError {
    fn from(err: CompilerError) -> Self {
        Self::Configuration(ConfigurationError::Compiler(err))
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// What went wrong in a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Extraction,
    Validation,
    Generation,
}

/// A non-fatal failure recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub generator: String,
    pub page: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.page {
            Some(page) => write!(f, "[{}] {page}: {}", self.generator, self.message),
            None => write!(f, "[{}] {}", self.generator, self.message),
        }
    }
}
