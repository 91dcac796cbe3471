//! Per-phase run contexts handed to generators.

use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use quire_compiler::CompilerRegistry;
use quire_core::{Config, Page};
use quire_options::OptionsExtractor;
use rayon::{ThreadPool, prelude::*};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{Failure, FailureKind, GenerationError},
    index::{FrozenIndex, GlobalIndex},
    template::{Renderer, TemplateContext},
    theme::Theme,
};

/// What a generator may read while indexing.
pub struct IndexingContext<'a> {
    config: &'a Config,
    index: &'a GlobalIndex,
    compilers: &'a CompilerRegistry,
    engine: &'a OptionsExtractor,
}

impl<'a> IndexingContext<'a> {
    pub(crate) fn new(
        config: &'a Config,
        index: &'a GlobalIndex,
        compilers: &'a CompilerRegistry,
        engine: &'a OptionsExtractor,
    ) -> Self {
        Self {
            config,
            index,
            compilers,
            engine,
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Pages indexed by generators that ran earlier.
    pub fn index(&self) -> &GlobalIndex {
        self.index
    }

    pub fn compilers(&self) -> &CompilerRegistry {
        self.compilers
    }

    /// The engine used to bind generator options, for binding page data.
    pub fn engine(&self) -> &OptionsExtractor {
        self.engine
    }

    pub fn resources_dir(&self) -> &Path {
        &self.config.site.resources_dir
    }

    pub fn base_url(&self) -> &str {
        &self.config.site.base_url
    }
}

/// Everything one generator may use while generating.
///
/// Failures recorded here are collected by the pipeline after the
/// generator returns.
pub struct GenerationContext<'a> {
    config: &'a Config,
    index: Arc<FrozenIndex>,
    compilers: &'a CompilerRegistry,
    theme: &'a dyn Theme,
    renderer: &'a dyn Renderer,
    pool: &'a ThreadPool,
    output_dir: &'a Path,
    generator: String,
    layout: Option<String>,
    parallel: bool,
    failures: Mutex<Vec<Failure>>,
    written: AtomicUsize,
}

/// Settings of the generator a [`GenerationContext`] is built for.
pub(crate) struct GeneratorScope<'a> {
    pub key: String,
    pub layout: Option<String>,
    pub parallel: bool,
    pub theme: &'a dyn Theme,
}

/// Shared run state a [`GenerationContext`] borrows.
pub(crate) struct RunScope<'a> {
    pub config: &'a Config,
    pub index: Arc<FrozenIndex>,
    pub compilers: &'a CompilerRegistry,
    pub renderer: &'a dyn Renderer,
    pub pool: &'a ThreadPool,
    pub output_dir: &'a Path,
}

impl<'a> GenerationContext<'a> {
    pub(crate) fn new(run: RunScope<'a>, generator: GeneratorScope<'a>) -> Self {
        Self {
            config: run.config,
            index: run.index,
            compilers: run.compilers,
            theme: generator.theme,
            renderer: run.renderer,
            pool: run.pool,
            output_dir: run.output_dir,
            generator: generator.key,
            layout: generator.layout,
            parallel: generator.parallel,
            failures: Mutex::new(Vec::new()),
            written: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// The frozen index of every generator's pages.
    pub fn index(&self) -> &FrozenIndex {
        &self.index
    }

    pub fn compilers(&self) -> &CompilerRegistry {
        self.compilers
    }

    /// Theme for this generator, honouring its override.
    pub fn theme(&self) -> &dyn Theme {
        self.theme
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir
    }

    pub fn generator(&self) -> &str {
        &self.generator
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Run `render` for every page, on the worker pool when the generator is
    /// parallel.
    ///
    /// Returns once every page is done. A page error is recorded and does
    /// not stop the others.
    pub fn render_each<F>(&self, pages: &[Page], render: F)
    where
        F: Fn(&Page) -> Result<(), GenerationError> + Send + Sync,
    {
        let run = |page: &Page| {
            if let Err(e) = render(page) {
                self.record_page_failure(page, &e);
            }
        };

        if self.parallel {
            debug!(generator = %self.generator, count = pages.len(), "rendering pages in parallel");
            self.pool.install(|| pages.par_iter().for_each(run));
        } else {
            pages.iter().for_each(run);
        }
    }

    /// Wrap `body` in the page's layout.
    ///
    /// The page's own layout wins over the generator's.
    pub fn render_page(&self, page: &Page, body: &str) -> Result<String, GenerationError> {
        let mut context = TemplateContext::new()
            .with_var("title", page.name())
            .with_var("url", page.url())
            .with_var("path", page.path())
            .with_var("generator", page.generator())
            .with_var("site_title", self.config.site.title.as_str())
            .with_var("base_url", self.config.site.base_url.as_str())
            .with_var("content", body);
        if let Some(description) = &page.description {
            context.insert("description", description.as_str());
        }
        for (key, value) in &page.data {
            if context.contains(key) {
                continue;
            }
            match value {
                Value::String(s) => context.insert(key.as_str(), s.as_str()),
                Value::Number(n) => context.insert(key.as_str(), n.to_string()),
                Value::Bool(b) => context.insert(key.as_str(), b.to_string()),
                _ => {}
            }
        }

        let layout = page.layout.as_deref().or(self.layout.as_deref());
        Ok(self.renderer.render(self.theme, layout, &context)?)
    }

    /// Write `content` to the page's output path.
    ///
    /// Only pages present in the frozen index may be written.
    pub fn write_page(&self, page: &Page, content: &str) -> Result<PathBuf, GenerationError> {
        if !self.index.contains_url(page.url()) {
            return Err(GenerationError::Unindexed {
                url: page.url().to_string(),
            });
        }

        let relative = Path::new(page.path());
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(GenerationError::OutsideOutput {
                path: page.path().to_string(),
            });
        }

        let path = self.output_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| GenerationError::io(parent, e))?;
        }
        fs::write(&path, content).map_err(|e| GenerationError::io(&path, e))?;
        self.written.fetch_add(1, Ordering::Relaxed);

        debug!(path = %path.display(), "wrote page");
        Ok(path)
    }

    /// Record a failure not tied to a page.
    pub fn record_failure(&self, error: &GenerationError) {
        self.push_failure(None, error);
    }

    fn record_page_failure(&self, page: &Page, error: &GenerationError) {
        self.push_failure(Some(page.url().to_string()), error);
    }

    fn push_failure(&self, page: Option<String>, error: &GenerationError) {
        warn!(
            generator = %self.generator,
            page = page.as_deref().unwrap_or("-"),
            error = %error,
            "generation failed"
        );
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Failure {
                generator: self.generator.clone(),
                page,
                kind: FailureKind::Generation,
                message: error.to_string(),
            });
    }

    /// Recorded failures and the number of files written.
    pub(crate) fn finish(self) -> (Vec<Failure>, usize) {
        let failures = self
            .failures
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        (failures, self.written.into_inner())
    }
}
