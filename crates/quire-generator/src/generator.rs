//! The generator plugin contract.

use quire_core::{PRIORITY_DEFAULT, Page, RawOptions};
use quire_options::{Archetype, Configurable, OptionSpec, OptionsHolder, SchemaBuilder};

use crate::{
    context::{GenerationContext, IndexingContext},
    error::{GenerationError, IndexingError},
    index::{Collection, FrozenIndex},
};

/// Theme selection for one generator.
///
/// Written either as a key (`theme = "docs"`) or a table with a `key` and
/// any options the theme reads.
#[derive(Debug, Clone, Default)]
pub struct ThemeOverride {
    pub key: Option<String>,
    pub all_options: RawOptions,
}

impl OptionsHolder for ThemeOverride {
    fn descriptive_name() -> &'static str {
        "Theme Override"
    }

    fn declare(options: &mut SchemaBuilder<Self>) {
        options
            .option(
                OptionSpec::string("key").describe("Key of the theme to render with."),
                |t| &mut t.key,
            )
            .all_options("allOptions", |t| &mut t.all_options);
    }
}

/// Options every generator inherits.
#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    pub theme: ThemeOverride,
    pub layout: Option<String>,
    pub parallel: bool,
    pub all_data: RawOptions,
}

impl OptionsHolder for GeneratorOptions {
    fn descriptive_name() -> &'static str {
        "Generator Options"
    }

    fn description() -> &'static str {
        "Options shared by all generators. Defaults come from the [allGenerators] table."
    }

    fn declare(options: &mut SchemaBuilder<Self>) {
        options
            .object(
                OptionSpec::new("theme")
                    .implied_key("key")
                    .describe("Theme used instead of the site theme for this generator's pages."),
                |o| &mut o.theme,
            )
            .option(
                OptionSpec::string("layout")
                    .describe("Layout used for pages that do not pick their own."),
                |o| &mut o.layout,
            )
            .option(
                OptionSpec::boolean("parallel")
                    .default_value(false)
                    .describe("Render this generator's pages on the worker pool."),
                |o| &mut o.parallel,
            )
            .all_options("allData", |o| &mut o.all_data)
            .archetype(Archetype::config("allGenerators"));
    }
}

impl GeneratorOptions {
    /// Theme key requested for this generator, if any.
    pub fn theme_key(&self) -> Option<&str> {
        self.theme.key.as_deref().filter(|k| !k.is_empty())
    }
}

/// A plugin producing pages in two phases.
///
/// The pipeline binds a generator's options from the site table named by its
/// key, validates them, calls [`start_indexing`](Generator::start_indexing)
/// once and, after every generator has indexed, calls
/// [`start_generation`](Generator::start_generation) once with exactly the
/// pages indexing returned.
pub trait Generator: Configurable {
    /// Key naming this generator's config table and index entry. Not unique.
    fn key(&self) -> &str;

    fn priority(&self) -> i32 {
        PRIORITY_DEFAULT
    }

    fn generator_options(&self) -> &GeneratorOptions;

    /// Discover pages. Pages indexed by higher-priority generators are visible
    /// through `ctx.index()`.
    fn start_indexing(&mut self, ctx: &IndexingContext<'_>) -> Result<Vec<Page>, IndexingError>;

    /// Render and write `pages`.
    fn start_generation(
        &self,
        pages: &[Page],
        ctx: &GenerationContext<'_>,
    ) -> Result<(), GenerationError>;

    /// Collections offered to other generators and themes.
    fn collections(&self, index: &FrozenIndex) -> Vec<Collection> {
        let pages = index.pages(self.key());
        if pages.is_empty() {
            return Vec::new();
        }
        vec![Collection::new(self.key(), self.key(), pages.to_vec())]
    }
}
