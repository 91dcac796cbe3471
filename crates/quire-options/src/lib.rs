//! Declarative option binding for Quire plugins.
//!
//! Plugins declare their options once per type through [`OptionsHolder`].
//! The [`OptionsExtractor`] binds raw configuration maps onto instances,
//! resolves archetype defaults, validates the result and describes every
//! option without needing an instance.
//!
//! ```ignore
//! #[derive(Default)]
//! struct PagesOptions {
//!     base_dir: String,
//!     include_drafts: bool,
//! }
//!
//! impl OptionsHolder for PagesOptions {
//!     fn declare(options: &mut SchemaBuilder<Self>) {
//!         options
//!             .option(
//!                 OptionSpec::string("base_dir").key("baseDir").default_value("pages"),
//!                 |o| &mut o.base_dir,
//!             )
//!             .option(OptionSpec::boolean("includeDrafts"), |o| &mut o.include_drafts);
//!     }
//! }
//! ```

pub mod archetype;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod schema;
pub mod validation;
pub mod value;

pub use archetype::{Archetype, ConfigArchetype, OptionArchetype};
pub use descriptor::{
    ArchetypeDescription, HolderDescription, ObjectType, OptionDescriptor, OptionSpec, OptionType,
};
pub use engine::{BindReport, Configurable, OptionsExtractor};
pub use error::{ConvertError, ExtractionError, OptionsError, Result, ValidationError};
pub use extractor::{ExtractCtx, OptionExtractor, default_extractors};
pub use schema::{FieldScope, OptionsHolder, Origin, SchemaBuilder, schema_of};
pub use validation::{HolderValidator, OptionsValidator};
pub use value::{FromOption, OptionValue};

/// Raw, untyped option data as read from configuration or frontmatter.
pub type RawOptions = serde_json::Map<String, serde_json::Value>;
