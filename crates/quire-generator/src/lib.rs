//! Quire Generator Library
//!
//! The generator pipeline: plugins index pages in priority order, the index
//! is frozen, then every plugin generates exactly the pages it indexed.

pub mod context;
pub mod error;
pub mod generator;
pub mod index;
pub mod pages;
pub mod pipeline;
pub mod sitemap;
pub mod template;
pub mod theme;

pub use context::{GenerationContext, IndexingContext};
pub use error::{
    ConfigurationError, Failure, FailureKind, GenerationError, IndexingError, PipelineError, Result,
};
pub use generator::{Generator, GeneratorOptions, ThemeOverride};
pub use index::{Collection, FrozenIndex, GlobalIndex};
pub use pages::{PageOptions, PagesGenerator};
pub use pipeline::{IndexedPipeline, Pipeline, RunSummary};
pub use sitemap::{ChangeFreq, SitemapGenerator};
pub use template::{LayoutRenderer, Renderer, Template, TemplateContext, TemplateError};
pub use theme::{DefaultTheme, Theme};
