//! Run orchestration.
//!
//! A run goes through three states: a configured [`Pipeline`], an
//! [`IndexedPipeline`] holding the frozen index, and a [`RunSummary`].
//! Generators run in priority order in both phases; equal priorities keep
//! registration order.

use std::{fs, path::PathBuf, sync::Arc, thread, time::Instant};

use quire_compiler::{Compiler, CompilerRegistry};
use quire_core::{Config, Page, priority_order};
use quire_options::{HolderDescription, OptionsExtractor};
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use crate::{
    context::{GenerationContext, GeneratorScope, IndexingContext, RunScope},
    error::{ConfigurationError, Failure, FailureKind, PipelineError, Result},
    generator::Generator,
    index::{Collection, FrozenIndex, GlobalIndex},
    pages::PagesGenerator,
    sitemap::SitemapGenerator,
    template::{LayoutRenderer, Renderer},
    theme::{DefaultTheme, Theme},
};

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Pages in the frozen index.
    pub pages: usize,

    /// Files written during generation.
    pub written: usize,

    pub collections: usize,

    /// Everything that failed without aborting the run.
    pub failures: Vec<Failure>,

    pub duration_ms: u64,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A configured pipeline, ready to index.
pub struct Pipeline {
    config: Config,
    engine: OptionsExtractor,
    generators: Vec<Box<dyn Generator>>,
    compilers: CompilerRegistry,
    themes: Vec<Box<dyn Theme>>,
    renderer: Box<dyn Renderer>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("generators", &self.generators.iter().map(|g| g.key()).collect::<Vec<_>>())
            .field("compilers", &self.compilers)
            .field("themes", &self.themes.iter().map(|t| t.key()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// An empty pipeline: no generators, compilers or themes.
    pub fn new(config: Config) -> Self {
        let engine = OptionsExtractor::new(config.data().clone());
        Self {
            config,
            engine,
            generators: Vec::new(),
            compilers: CompilerRegistry::new(),
            themes: Vec::new(),
            renderer: Box::new(LayoutRenderer),
        }
    }

    /// A pipeline with the built-in compilers, the default theme and the
    /// `pages` and `sitemap` generators.
    pub fn with_defaults(config: Config) -> Result<Self> {
        let mut pipeline = Self::new(config);
        pipeline.compilers = CompilerRegistry::with_defaults()?;
        pipeline.register_theme(DefaultTheme::new());
        pipeline.register_generator(PagesGenerator::new());
        pipeline.register_generator(SitemapGenerator::new());
        Ok(pipeline)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &OptionsExtractor {
        &self.engine
    }

    /// Replace the options engine, e.g. to add extractors.
    #[must_use]
    pub fn with_engine(mut self, engine: OptionsExtractor) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn register_generator(&mut self, generator: impl Generator + 'static) {
        debug!(
            generator = generator.key(),
            priority = generator.priority(),
            "registered generator"
        );
        self.generators.push(Box::new(generator));
    }

    pub fn register_compiler(&mut self, compiler: impl Compiler + 'static) -> Result<()> {
        self.compilers.register(compiler)?;
        Ok(())
    }

    /// Register a theme, replacing any theme with the same key.
    pub fn register_theme(&mut self, theme: impl Theme + 'static) {
        self.themes.retain(|t| t.key() != theme.key());
        self.themes.push(Box::new(theme));
    }

    pub fn generators(&self) -> impl Iterator<Item = &dyn Generator> {
        self.generators.iter().map(|g| g.as_ref())
    }

    pub fn theme(&self, key: &str) -> Option<&dyn Theme> {
        self.themes
            .iter()
            .find(|t| t.key() == key)
            .map(|t| t.as_ref())
    }

    /// Confirm the settings a run cannot start without.
    ///
    /// Returns the site theme.
    pub fn sanity_check(&self) -> std::result::Result<&dyn Theme, ConfigurationError> {
        if self.config.site.output_dir.is_none() {
            return Err(ConfigurationError::MissingOutputDir);
        }

        let key = self
            .config
            .site
            .theme
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigurationError::MissingTheme)?;
        let theme = self
            .theme(key)
            .ok_or_else(|| ConfigurationError::UnknownTheme {
                theme: key.to_string(),
            })?;

        let missing = theme.missing_options(self.config.data());
        if !missing.is_empty() {
            return Err(ConfigurationError::MissingThemeOptions {
                theme: key.to_string(),
                missing,
            });
        }

        if let Some(position) = self.generators.iter().position(|g| g.key().is_empty()) {
            return Err(ConfigurationError::EmptyGeneratorKey { position });
        }

        Ok(theme)
    }

    /// Option descriptions of every registered generator, in registration order.
    pub fn describe_generators(&self) -> Vec<(String, HolderDescription)> {
        self.generators
            .iter()
            .map(|g| (g.key().to_string(), g.describe(&self.engine)))
            .collect()
    }

    /// Bind, validate and index every generator.
    ///
    /// Fails before touching any generator when the sanity check fails, and
    /// aborts on the first indexing error.
    pub fn index(mut self) -> Result<IndexedPipeline> {
        let started = Instant::now();
        let site_theme = self.sanity_check()?.key().to_string();

        let mut failures = Vec::new();
        let mut usable = vec![true; self.generators.len()];

        for (position, generator) in self.generators.iter_mut().enumerate() {
            let key = generator.key().to_string();
            let raw = self.config.section(&key);
            let report = generator.bind_options(&self.engine, &raw)?;
            failures.extend(report.into_errors().into_iter().map(|e| Failure {
                generator: key.clone(),
                page: None,
                kind: FailureKind::Extraction,
                message: e.to_string(),
            }));

            if let Err(e) = generator.validate_options(&self.engine) {
                usable[position] = false;
                failures.push(Failure {
                    generator: key,
                    page: None,
                    kind: FailureKind::Validation,
                    message: e.to_string(),
                });
            }
        }

        let order = priority_order(self.generators.iter().map(|g| g.priority()));
        let mut index = GlobalIndex::new();
        let mut indexed: Vec<Option<Vec<Page>>> = (0..self.generators.len()).map(|_| None).collect();

        for &position in &order {
            if !usable[position] {
                warn!(generator = self.generators[position].key(), "skipping invalid generator");
                continue;
            }

            let generator = &mut self.generators[position];
            let key = generator.key().to_string();
            info!(generator = %key, priority = generator.priority(), "indexing");

            let ctx = IndexingContext::new(&self.config, &index, &self.compilers, &self.engine);
            let pages = generator
                .start_indexing(&ctx)
                .map_err(|source| PipelineError::Indexing {
                    generator: key.clone(),
                    source,
                })?;

            debug!(generator = %key, count = pages.len(), "indexed");
            index.add(&key, pages.clone());
            indexed[position] = Some(pages);
        }

        let index = index.freeze();
        info!(pages = index.len(), "index frozen");

        Ok(IndexedPipeline {
            pipeline: self,
            index,
            indexed,
            order,
            failures,
            site_theme,
            started,
        })
    }

    /// Index, then generate.
    pub fn run(self) -> Result<RunSummary> {
        self.index()?.generate()
    }
}

/// A pipeline whose index is frozen, ready to generate.
pub struct IndexedPipeline {
    pipeline: Pipeline,
    index: Arc<FrozenIndex>,
    indexed: Vec<Option<Vec<Page>>>,
    order: Vec<usize>,
    failures: Vec<Failure>,
    site_theme: String,
    started: Instant,
}

impl IndexedPipeline {
    pub fn index(&self) -> &FrozenIndex {
        &self.index
    }

    /// Failures recorded while binding and validating.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Collections of every indexed generator, in run order.
    pub fn collections(&self) -> Vec<Collection> {
        self.order
            .iter()
            .filter(|&&position| self.indexed[position].is_some())
            .flat_map(|&position| self.pipeline.generators[position].collections(&self.index))
            .collect()
    }

    /// Run every indexed generator's generation phase.
    ///
    /// Generation failures are recorded in the summary; only IO errors on
    /// the output directory or a pool that cannot start abort.
    pub fn generate(self) -> Result<RunSummary> {
        let collections = self.collections().len();
        let Self {
            pipeline,
            index,
            indexed,
            order,
            mut failures,
            site_theme,
            started,
        } = self;

        let output_dir: PathBuf = pipeline
            .config
            .site
            .output_dir
            .clone()
            .ok_or(ConfigurationError::MissingOutputDir)?;
        fs::create_dir_all(&output_dir)?;

        let workers = pipeline.config.site.workers.unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
        debug!(workers, "worker pool ready");

        let fallback_theme = pipeline
            .theme(&site_theme)
            .ok_or_else(|| ConfigurationError::UnknownTheme {
                theme: site_theme.clone(),
            })?;

        let mut written = 0;
        for &position in &order {
            let Some(pages) = &indexed[position] else {
                continue;
            };
            let generator = &pipeline.generators[position];
            let key = generator.key().to_string();
            let options = generator.generator_options();

            let theme = match options.theme_key() {
                Some(theme_key) => match pipeline.theme(theme_key) {
                    Some(theme) => theme,
                    None => {
                        warn!(generator = %key, theme = theme_key, "unknown theme override");
                        failures.push(Failure {
                            generator: key,
                            page: None,
                            kind: FailureKind::Generation,
                            message: ConfigurationError::UnknownTheme {
                                theme: theme_key.to_string(),
                            }
                            .to_string(),
                        });
                        continue;
                    }
                },
                None => fallback_theme,
            };

            info!(generator = %key, pages = pages.len(), theme = theme.key(), "generating");
            let ctx = GenerationContext::new(
                RunScope {
                    config: &pipeline.config,
                    index: Arc::clone(&index),
                    compilers: &pipeline.compilers,
                    renderer: pipeline.renderer.as_ref(),
                    pool: &pool,
                    output_dir: &output_dir,
                },
                GeneratorScope {
                    key,
                    layout: options.layout.clone(),
                    parallel: options.parallel,
                    theme,
                },
            );

            if let Err(e) = generator.start_generation(pages, &ctx) {
                ctx.record_failure(&e);
            }
            let (recorded, count) = ctx.finish();
            written += count;
            failures.extend(recorded);
        }

        let summary = RunSummary {
            pages: index.len(),
            written,
            collections,
            failures,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            pages = summary.pages,
            written = summary.written,
            failures = summary.failures.len(),
            duration_ms = summary.duration_ms,
            "run complete"
        );
        Ok(summary)
    }
}
