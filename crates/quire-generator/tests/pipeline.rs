//! Ordering, isolation and failure handling of the generator pipeline.

use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use quire_core::{Config, PRIORITY_DEFAULT, PRIORITY_INIT, PRIORITY_LATE, Page, RawOptions};
use quire_generator::{
    ConfigurationError, DefaultTheme, FailureKind, GenerationContext, GenerationError, Generator,
    GeneratorOptions, IndexingContext, IndexingError, Pipeline, PipelineError, Theme,
};
use quire_options::{Archetype, OptionSpec, OptionsHolder, SchemaBuilder};
use serde_json::{Value, json};
use walkdir::WalkDir;

type Log = Arc<Mutex<Vec<String>>>;

fn config(value: Value) -> Config {
    Config::from_value(value).expect("config")
}

fn site(output: &Path, extra: Value) -> Config {
    let mut document = json!({
        "site": {
            "title": "Test",
            "base_url": "https://example.com",
            "output_dir": output.display().to_string(),
            "theme": "default",
        },
    });
    if let (Value::Object(doc), Value::Object(extra)) = (&mut document, extra) {
        doc.extend(extra);
    }
    config(document)
}

/// Records every lifecycle call and produces `count` numbered pages.
struct Recorder {
    key: &'static str,
    priority: i32,
    count: usize,
    options: GeneratorOptions,
    log: Log,
}

impl Recorder {
    fn new(key: &'static str, priority: i32, count: usize, log: &Log) -> Self {
        Self {
            key,
            priority,
            count,
            options: GeneratorOptions::default(),
            log: Arc::clone(log),
        }
    }

    fn push(&self, entry: String) {
        self.log.lock().expect("log").push(entry);
    }
}

impl OptionsHolder for Recorder {
    fn declare(options: &mut SchemaBuilder<Self>) {
        options.inherit(|r| &mut r.options);
    }

    fn check(&self) -> Result<(), String> {
        self.push(format!("check:{}", self.key));
        Ok(())
    }
}

impl Generator for Recorder {
    fn key(&self) -> &str {
        self.key
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn generator_options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn start_indexing(&mut self, ctx: &IndexingContext<'_>) -> Result<Vec<Page>, IndexingError> {
        self.push(format!("index:{}:seen={}", self.key, ctx.index().len()));
        Ok((0..self.count)
            .map(|i| {
                Page::new(
                    format!("{} {i}", self.key),
                    self.key,
                    format!("{}/{i}/index.html", self.key),
                    ctx.base_url(),
                )
            })
            .collect())
    }

    fn start_generation(
        &self,
        pages: &[Page],
        ctx: &GenerationContext<'_>,
    ) -> Result<(), GenerationError> {
        self.push(format!("generate:{}:pages={}", self.key, pages.len()));
        ctx.render_each(pages, |page| {
            let body = format!("<p>{} of {}</p>", page.name(), ctx.index().len());
            let html = ctx.render_page(page, &body)?;
            ctx.write_page(page, &html)?;
            Ok(())
        });
        Ok(())
    }
}

fn entries(log: &Log, prefix: &str) -> Vec<String> {
    log.lock()
        .expect("log")
        .iter()
        .filter(|e| e.starts_with(prefix))
        .cloned()
        .collect()
}

#[test]
fn test_priority_order_holds_in_both_phases() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = Log::default();

    let mut pipeline = Pipeline::new(site(dir.path(), json!({})));
    pipeline.register_theme(DefaultTheme::new());
    pipeline.register_generator(Recorder::new("first-default", PRIORITY_DEFAULT, 1, &log));
    pipeline.register_generator(Recorder::new("late", PRIORITY_LATE, 1, &log));
    pipeline.register_generator(Recorder::new("init", PRIORITY_INIT, 2, &log));
    pipeline.register_generator(Recorder::new("second-default", PRIORITY_DEFAULT, 1, &log));

    let summary = pipeline.run().expect("run");
    assert!(summary.is_success(), "{:?}", summary.failures);

    assert_eq!(
        entries(&log, "index:"),
        vec![
            "index:init:seen=0",
            "index:first-default:seen=2",
            "index:second-default:seen=3",
            "index:late:seen=4",
        ]
    );
    assert_eq!(
        entries(&log, "generate:"),
        vec![
            "generate:init:pages=2",
            "generate:first-default:pages=1",
            "generate:second-default:pages=1",
            "generate:late:pages=1",
        ]
    );
    assert_eq!(summary.pages, 5);
    assert_eq!(summary.written, 5);
    assert_eq!(summary.collections, 4);
}

#[test]
fn test_generators_sharing_a_key_get_their_own_pages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = Log::default();

    let mut pipeline = Pipeline::new(site(dir.path(), json!({})));
    pipeline.register_theme(DefaultTheme::new());
    pipeline.register_generator(Recorder::new("docs", PRIORITY_DEFAULT, 2, &log));
    pipeline.register_generator(Recorder::new("docs", PRIORITY_LATE, 0, &log));

    let indexed = pipeline.index().expect("index");
    assert_eq!(indexed.index().pages("docs").len(), 2);
    assert_eq!(indexed.collections().len(), 2);

    let summary = indexed.generate().expect("generate");
    assert_eq!(
        entries(&log, "generate:"),
        vec!["generate:docs:pages=2", "generate:docs:pages=0"]
    );
    assert_eq!(summary.written, 2);
}

fn output_files(root: &Path) -> Vec<(String, String)> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e
                .path()
                .strip_prefix(root)
                .expect("inside output")
                .display()
                .to_string();
            let content = fs::read_to_string(e.path()).expect("read output");
            (relative, content)
        })
        .collect()
}

fn build_with_workers(workers: usize) -> Vec<(String, String)> {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = Log::default();
    let config = site(
        dir.path(),
        json!({
            "site": {
                "title": "Test",
                "base_url": "https://example.com",
                "output_dir": dir.path().display().to_string(),
                "theme": "default",
                "workers": workers,
            },
            "bulk": { "parallel": true },
        }),
    );

    let mut pipeline = Pipeline::new(config);
    pipeline.register_theme(DefaultTheme::new());
    pipeline.register_generator(Recorder::new("bulk", PRIORITY_DEFAULT, 50, &log));

    let summary = pipeline.run().expect("run");
    assert!(summary.is_success(), "{:?}", summary.failures);
    assert_eq!(summary.written, 50);
    output_files(dir.path())
}

#[test]
fn test_parallel_output_matches_sequential() {
    let sequential = build_with_workers(1);
    let parallel = build_with_workers(8);

    assert_eq!(sequential.len(), 50);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_missing_output_dir_aborts_before_any_generator_call() {
    let log = Log::default();
    let mut pipeline = Pipeline::new(config(json!({ "site": { "theme": "default" } })));
    pipeline.register_theme(DefaultTheme::new());
    pipeline.register_generator(Recorder::new("pages", PRIORITY_DEFAULT, 1, &log));

    let err = pipeline.run().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Configuration(ConfigurationError::MissingOutputDir)
    ));
    assert!(log.lock().expect("log").is_empty());
}

#[test]
fn test_sanity_check_theme_settings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().display().to_string();

    let pipeline = Pipeline::new(config(json!({ "site": { "output_dir": output } })));
    assert!(matches!(
        pipeline.sanity_check(),
        Err(ConfigurationError::MissingTheme)
    ));

    let pipeline = Pipeline::new(config(json!({
        "site": { "output_dir": output, "theme": "docs" },
    })));
    assert!(matches!(
        pipeline.sanity_check(),
        Err(ConfigurationError::UnknownTheme { theme }) if theme == "docs"
    ));
}

struct NeedsLogo;

impl Theme for NeedsLogo {
    fn key(&self) -> &str {
        "branded"
    }

    fn required_options(&self) -> &[&str] {
        &["branded.logo"]
    }

    fn layout(&self, _name: &str) -> Option<&quire_generator::Template> {
        None
    }
}

#[test]
fn test_missing_theme_options_are_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = Log::default();
    let output = dir.path().display().to_string();

    let mut pipeline = Pipeline::new(config(json!({
        "site": { "output_dir": output, "theme": "branded" },
    })));
    pipeline.register_theme(NeedsLogo);
    pipeline.register_generator(Recorder::new("pages", PRIORITY_DEFAULT, 1, &log));

    match pipeline.run() {
        Err(PipelineError::Configuration(ConfigurationError::MissingThemeOptions {
            theme,
            missing,
        })) => {
            assert_eq!(theme, "branded");
            assert_eq!(missing, vec!["branded.logo"]);
        }
        other => panic!("expected missing theme options, got {other:?}"),
    }
    assert!(log.lock().expect("log").is_empty());

    let mut pipeline = Pipeline::new(config(json!({
        "site": { "output_dir": output, "theme": "branded" },
        "branded": { "logo": "logo.svg" },
    })));
    pipeline.register_theme(NeedsLogo);
    assert!(pipeline.sanity_check().is_ok());
}

/// Writes a page that was never indexed.
#[derive(Default)]
struct Rogue {
    options: GeneratorOptions,
}

impl OptionsHolder for Rogue {
    fn declare(options: &mut SchemaBuilder<Self>) {
        options.inherit(|r| &mut r.options);
    }
}

impl Generator for Rogue {
    fn key(&self) -> &str {
        "rogue"
    }

    fn generator_options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn start_indexing(&mut self, _ctx: &IndexingContext<'_>) -> Result<Vec<Page>, IndexingError> {
        Ok(Vec::new())
    }

    fn start_generation(
        &self,
        _pages: &[Page],
        ctx: &GenerationContext<'_>,
    ) -> Result<(), GenerationError> {
        let ghost = Page::new("Ghost", "rogue", "ghost/index.html", &ctx.config().site.base_url);
        ctx.write_page(&ghost, "boo")?;
        Ok(())
    }
}

#[test]
fn test_write_outside_index_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = Log::default();

    let mut pipeline = Pipeline::new(site(dir.path(), json!({})));
    pipeline.register_theme(DefaultTheme::new());
    pipeline.register_generator(Rogue::default());
    pipeline.register_generator(Recorder::new("after", PRIORITY_LATE, 1, &log));

    let summary = pipeline.run().expect("run");
    assert!(!summary.is_success());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].generator, "rogue");
    assert_eq!(summary.failures[0].kind, FailureKind::Generation);
    assert!(summary.failures[0].message.contains("is not in the site index"));
    assert!(!dir.path().join("ghost/index.html").exists());

    assert_eq!(entries(&log, "generate:"), vec!["generate:after:pages=1"]);
}

/// Indexes a stored page whose path climbs out of the output directory.
#[derive(Default)]
struct Escaping {
    options: GeneratorOptions,
}

impl OptionsHolder for Escaping {
    fn declare(options: &mut SchemaBuilder<Self>) {
        options.inherit(|e| &mut e.options);
    }
}

impl Generator for Escaping {
    fn key(&self) -> &str {
        "escaping"
    }

    fn generator_options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn start_indexing(&mut self, _ctx: &IndexingContext<'_>) -> Result<Vec<Page>, IndexingError> {
        let page: Page = serde_json::from_value(json!({
            "name": "Escaped",
            "url": "https://example.com/escaped.html",
            "path": "../escaped.html",
            "generator": "escaping",
        }))
        .map_err(|e| IndexingError::Other(e.to_string()))?;
        Ok(vec![page])
    }

    fn start_generation(
        &self,
        pages: &[Page],
        ctx: &GenerationContext<'_>,
    ) -> Result<(), GenerationError> {
        ctx.render_each(pages, |page| {
            ctx.write_page(page, "out")?;
            Ok(())
        });
        Ok(())
    }
}

#[test]
fn test_write_outside_output_dir_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("public");

    let mut pipeline = Pipeline::new(site(&output, json!({})));
    pipeline.register_theme(DefaultTheme::new());
    pipeline.register_generator(Escaping::default());

    let summary = pipeline.run().expect("run");
    assert_eq!(summary.written, 0);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].page.as_deref(), Some("https://example.com/escaped.html"));
    assert!(summary.failures[0].message.contains("outside the output directory"));
    assert!(!dir.path().join("escaped.html").exists());
}

/// Fails indexing.
#[derive(Default)]
struct Broken {
    options: GeneratorOptions,
}

impl OptionsHolder for Broken {
    fn declare(options: &mut SchemaBuilder<Self>) {
        options.inherit(|b| &mut b.options);
    }
}

impl Generator for Broken {
    fn key(&self) -> &str {
        "broken"
    }

    fn generator_options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn start_indexing(&mut self, _ctx: &IndexingContext<'_>) -> Result<Vec<Page>, IndexingError> {
        Err(IndexingError::Other("source unavailable".into()))
    }

    fn start_generation(
        &self,
        _pages: &[Page],
        _ctx: &GenerationContext<'_>,
    ) -> Result<(), GenerationError> {
        Ok(())
    }
}

#[test]
fn test_indexing_error_aborts_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = Log::default();

    let mut pipeline = Pipeline::new(site(dir.path(), json!({})));
    pipeline.register_theme(DefaultTheme::new());
    pipeline.register_generator(Broken::default());
    pipeline.register_generator(Recorder::new("later", PRIORITY_LATE, 1, &log));

    match pipeline.run() {
        Err(PipelineError::Indexing { generator, source }) => {
            assert_eq!(generator, "broken");
            assert_eq!(source.to_string(), "source unavailable");
        }
        other => panic!("expected indexing error, got {other:?}"),
    }
    assert!(entries(&log, "index:").is_empty());
    assert!(entries(&log, "generate:").is_empty());
}

/// Shared base of the described generator.
#[derive(Debug, Default)]
struct Titled {
    title: String,
}

impl OptionsHolder for Titled {
    fn declare(options: &mut SchemaBuilder<Self>) {
        options.option(OptionSpec::string("title"), |t| &mut t.title);
    }
}

#[derive(Default)]
struct Listing {
    base: Titled,
    layout: Option<String>,
    parallel: bool,
    options: GeneratorOptions,
}

impl OptionsHolder for Listing {
    fn declare(options: &mut SchemaBuilder<Self>) {
        options
            .inherit(|l| &mut l.base)
            .option(OptionSpec::string("layout"), |l| &mut l.layout)
            .option(
                OptionSpec::boolean("parallel").default_value(false),
                |l| &mut l.parallel,
            );
    }
}

impl Generator for Listing {
    fn key(&self) -> &str {
        "listing"
    }

    fn generator_options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn start_indexing(&mut self, _ctx: &IndexingContext<'_>) -> Result<Vec<Page>, IndexingError> {
        Ok(Vec::new())
    }

    fn start_generation(
        &self,
        _pages: &[Page],
        _ctx: &GenerationContext<'_>,
    ) -> Result<(), GenerationError> {
        Ok(())
    }
}

#[test]
fn test_describe_generator_options() {
    let mut pipeline = Pipeline::new(config(json!({})));
    pipeline.register_generator(Listing::default());

    let described = pipeline.describe_generators();
    assert_eq!(described.len(), 1);
    let (key, description) = &described[0];
    assert_eq!(key, "listing");

    let rows: Vec<(&str, &str)> = description
        .options
        .iter()
        .map(|o| (o.key.as_str(), o.default_value.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![("layout", "N/A"), ("parallel", "false"), ("title", "N/A")]
    );
}

/// Reads its defaults from a dedicated site table.
#[derive(Default)]
struct Archived {
    label: String,
    options: GeneratorOptions,
}

impl OptionsHolder for Archived {
    fn declare(options: &mut SchemaBuilder<Self>) {
        options
            .inherit(|a| &mut a.options)
            .option(OptionSpec::string("label"), |a| &mut a.label)
            .archetype(Archetype::config("defaults.archive"));
    }
}

impl Generator for Archived {
    fn key(&self) -> &str {
        "archive"
    }

    fn generator_options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn start_indexing(&mut self, ctx: &IndexingContext<'_>) -> Result<Vec<Page>, IndexingError> {
        let mut page = Page::new(self.label.clone(), "archive", "archive/index.html", ctx.base_url());
        page.layout = self.options.layout.clone();
        Ok(vec![page])
    }

    fn start_generation(
        &self,
        pages: &[Page],
        ctx: &GenerationContext<'_>,
    ) -> Result<(), GenerationError> {
        for page in pages {
            let html = ctx.render_page(page, "")?;
            ctx.write_page(page, &html)?;
        }
        Ok(())
    }
}

#[test]
fn test_archetype_layers_apply_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = site(
        dir.path(),
        json!({
            "allGenerators": { "layout": "bare" },
            "defaults": { "archive": { "label": "From archetype", "layout": "page" } },
            "archive": { "label": "Explicit" },
        }),
    );

    let mut pipeline = Pipeline::new(config);
    pipeline.register_theme(DefaultTheme::new());
    pipeline.register_generator(Archived::default());

    let indexed = pipeline.index().expect("index");
    let page = &indexed.index().pages("archive")[0];
    assert_eq!(page.name(), "Explicit");
    assert_eq!(page.layout.as_deref(), Some("page"));

    let summary = indexed.generate().expect("generate");
    assert!(summary.is_success(), "{:?}", summary.failures);
    let html = fs::read_to_string(dir.path().join("archive/index.html")).expect("read");
    assert!(html.contains("<title>Explicit | Test</title>"));
}

#[test]
fn test_extraction_and_validation_failures_are_recorded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = site(
        dir.path(),
        json!({
            "sitemap": { "changefreq": "sometimes" },
            "pages": { "parallel": [true] },
        }),
    );

    let pipeline = Pipeline::with_defaults(config).expect("pipeline");
    let summary = pipeline.run().expect("run");

    let kinds: Vec<(&str, FailureKind)> = summary
        .failures
        .iter()
        .map(|f| (f.generator.as_str(), f.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("pages", FailureKind::Extraction),
            ("sitemap", FailureKind::Validation),
        ]
    );
    assert!(!dir.path().join("sitemap.xml").exists());
}

#[test]
fn test_unknown_theme_override_skips_generator() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = Log::default();
    let config = site(dir.path(), json!({ "odd": { "theme": "missing" } }));

    let mut pipeline = Pipeline::new(config);
    pipeline.register_theme(DefaultTheme::new());
    pipeline.register_generator(Recorder::new("odd", PRIORITY_DEFAULT, 1, &log));
    pipeline.register_generator(Recorder::new("even", PRIORITY_DEFAULT, 1, &log));

    let summary = pipeline.run().expect("run");
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].generator, "odd");
    assert_eq!(
        summary.failures[0].message,
        "theme 'missing' is not registered"
    );
    assert_eq!(entries(&log, "generate:"), vec!["generate:even:pages=1"]);
    assert_eq!(summary.written, 1);
}

#[test]
fn test_every_run_builds_a_fresh_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = Log::default();

    for _ in 0..2 {
        let mut pipeline = Pipeline::new(site(dir.path(), json!({})));
        pipeline.register_theme(DefaultTheme::new());
        pipeline.register_generator(Recorder::new("solo", PRIORITY_DEFAULT, 3, &log));
        let summary = pipeline.run().expect("run");
        assert_eq!(summary.pages, 3);
    }

    assert_eq!(
        entries(&log, "index:"),
        vec!["index:solo:seen=0", "index:solo:seen=0"]
    );
}

#[test]
fn test_empty_site_data_binds_defaults() {
    let mut options = GeneratorOptions::default();
    let engine = quire_options::OptionsExtractor::new(RawOptions::new());
    let report = engine.extract(&mut options, &RawOptions::new()).expect("bind");

    assert!(report.is_clean());
    assert!(!options.parallel);
    assert!(options.layout.is_none());
}
