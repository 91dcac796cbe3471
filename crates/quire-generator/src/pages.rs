//! Content pages compiled from files under the resources directory.

use std::{collections::HashMap, fs, path::Path};

use chrono::{DateTime, Utc};
use quire_core::{PRIORITY_EARLY, Page, RawOptions, frontmatter::parse_frontmatter, pretty_path};
use quire_options::{OptionSpec, OptionsHolder, SchemaBuilder};
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

use crate::{
    context::{GenerationContext, IndexingContext},
    error::{GenerationError, IndexingError},
    generator::{Generator, GeneratorOptions},
};

/// Frontmatter options of a single page.
#[derive(Debug, Default)]
pub struct PageOptions {
    pub title: Option<String>,
    pub layout: Option<String>,
    pub description: Option<String>,
    pub draft: bool,
    pub data: RawOptions,
}

impl OptionsHolder for PageOptions {
    fn descriptive_name() -> &'static str {
        "Page"
    }

    fn declare(options: &mut SchemaBuilder<Self>) {
        options
            .option(
                OptionSpec::string("title").describe("Page title. Defaults to the file name."),
                |p| &mut p.title,
            )
            .option(OptionSpec::string("layout"), |p| &mut p.layout)
            .option(OptionSpec::string("description"), |p| &mut p.description)
            .option(
                OptionSpec::boolean("draft").default_value(false),
                |p| &mut p.draft,
            )
            .all_options("data", |p| &mut p.data);
    }
}

/// Compiles every file under `<resources>/<baseDir>` a compiler accepts.
///
/// `about.md` becomes `about/index.html`; files starting with `_` are left to
/// the compilers' ignore patterns.
#[derive(Debug)]
pub struct PagesGenerator {
    options: GeneratorOptions,
    base_dir: String,
    include_drafts: bool,
    bodies: HashMap<String, String>,
}

impl Default for PagesGenerator {
    fn default() -> Self {
        Self {
            options: GeneratorOptions::default(),
            base_dir: "pages".to_string(),
            include_drafts: false,
            bodies: HashMap::new(),
        }
    }
}

impl PagesGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_file(
        &mut self,
        ctx: &IndexingContext<'_>,
        path: &Path,
        relative: &Path,
        output_extension: &str,
    ) -> Result<Option<(Page, String)>, IndexingError> {
        let content = fs::read_to_string(path).map_err(|e| IndexingError::io(path, e))?;
        let (data, body) = parse_frontmatter(&content, path)?;

        let mut options = PageOptions::default();
        let report = ctx.engine().extract(&mut options, &data)?;
        for failure in report.errors() {
            warn!(path = %path.display(), "{failure}");
        }

        if options.draft && !self.include_drafts {
            debug!(path = %path.display(), "skipping draft");
            return Ok(None);
        }

        let title = options
            .title
            .unwrap_or_else(|| title_from_stem(relative));
        let mut page = Page::new(
            title,
            self.key(),
            pretty_path(relative, output_extension),
            ctx.base_url(),
        )
        .with_source(path);
        page.layout = options.layout;
        page.description = options.description;
        page.updated = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        page.data = options.data;

        Ok(Some((page, body)))
    }
}

impl OptionsHolder for PagesGenerator {
    fn descriptive_name() -> &'static str {
        "Pages"
    }

    fn description() -> &'static str {
        "Compiles content files into pages rendered with the theme layout."
    }

    fn declare(options: &mut SchemaBuilder<Self>) {
        options
            .inherit(|g| &mut g.options)
            .option(
                OptionSpec::string("baseDir")
                    .default_value("pages")
                    .describe("Directory under the resources directory holding content files."),
                |g| &mut g.base_dir,
            )
            .option(
                OptionSpec::boolean("includeDrafts")
                    .default_value(false)
                    .describe("Also render pages marked `draft: true`."),
                |g| &mut g.include_drafts,
            );
    }

    fn check(&self) -> Result<(), String> {
        if self.base_dir.trim().is_empty() {
            return Err("baseDir cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Generator for PagesGenerator {
    fn key(&self) -> &str {
        "pages"
    }

    fn priority(&self) -> i32 {
        PRIORITY_EARLY
    }

    fn generator_options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn start_indexing(&mut self, ctx: &IndexingContext<'_>) -> Result<Vec<Page>, IndexingError> {
        let base = ctx.resources_dir().join(&self.base_dir);
        if !base.is_dir() {
            warn!(dir = %base.display(), "pages directory does not exist");
            return Ok(Vec::new());
        }

        self.bodies.clear();
        let mut claimed: HashMap<String, String> = ctx
            .index()
            .all_pages()
            .map(|p| (p.url().to_string(), format!("generator '{}'", p.generator())))
            .collect();

        let mut pages = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry.map_err(|e| IndexingError::io(&base, e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&base).unwrap_or(path);
            let file_name = entry.file_name().to_string_lossy();
            let output_extension = match ctx.compilers().resolve_for(&file_name) {
                Ok(compiler) => compiler.output_extension().to_string(),
                Err(reason) => {
                    trace!(path = %path.display(), %reason, "skipping file");
                    continue;
                }
            };

            let Some((page, body)) = self.index_file(ctx, path, relative, &output_extension)?
            else {
                continue;
            };

            let origin = path.display().to_string();
            if let Some(first) = claimed.get(page.url()) {
                return Err(IndexingError::DuplicateUrl {
                    url: page.url().to_string(),
                    first: first.clone(),
                    second: origin,
                });
            }
            claimed.insert(page.url().to_string(), origin);
            self.bodies.insert(page.url().to_string(), body);
            pages.push(page);
        }

        info!(count = pages.len(), dir = %base.display(), "indexed pages");
        Ok(pages)
    }

    fn start_generation(
        &self,
        pages: &[Page],
        ctx: &GenerationContext<'_>,
    ) -> Result<(), GenerationError> {
        ctx.render_each(pages, |page| {
            let body = self.bodies.get(page.url()).ok_or_else(|| {
                GenerationError::Other(format!("no source indexed for {}", page.url()))
            })?;
            let file_name = page
                .source
                .as_deref()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
                .unwrap_or_default();

            let compiled = ctx.compilers().compile_file(file_name, body, &page.data)?;
            let html = ctx.render_page(page, &compiled.content)?;
            ctx.write_page(page, &html)?;
            Ok(())
        });
        Ok(())
    }
}

/// `getting-started.md` is titled "Getting Started"; `index.md` takes its directory's name.
fn title_from_stem(relative: &Path) -> String {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = if stem == "index" {
        relative
            .parent()
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Home".to_string())
    } else {
        stem
    };

    stem.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
