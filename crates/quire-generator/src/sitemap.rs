//! Sitemap generation.
//!
//! Indexes a single `sitemap.xml` and fills it from the frozen index, so it
//! lists pages of every generator, including those running after it.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use quire_core::{PRIORITY_LATE, Page};
use quire_options::{OptionSpec, OptionType, OptionsHolder, SchemaBuilder};
use tracing::debug;

use crate::{
    context::{GenerationContext, IndexingContext},
    error::{GenerationError, IndexingError},
    generator::{Generator, GeneratorOptions},
};

/// Change frequency for sitemap entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

impl FromStr for ChangeFreq {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            other => Err(format!("unknown change frequency '{other}'")),
        }
    }
}

/// A sitemap URL entry.
#[derive(Debug, Clone)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub changefreq: ChangeFreq,
    /// Between 0.0 and 1.0.
    pub priority: f32,
}

impl SitemapUrl {
    fn from_page(page: &Page, changefreq: ChangeFreq) -> Self {
        let priority = if page.path() == "index.html" { 1.0 } else { 0.5 };
        Self {
            loc: page.url().to_string(),
            lastmod: page.updated,
            changefreq,
            priority,
        }
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&self.loc)));
        if let Some(lastmod) = &self.lastmod {
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                lastmod.format("%Y-%m-%d")
            ));
        }
        xml.push_str(&format!(
            "    <changefreq>{}</changefreq>\n",
            self.changefreq.as_str()
        ));
        xml.push_str(&format!("    <priority>{:.1}</priority>\n", self.priority));
        xml.push_str("  </url>\n");
        xml
    }
}

/// Writes `sitemap.xml` listing every HTML page in the index.
#[derive(Debug)]
pub struct SitemapGenerator {
    options: GeneratorOptions,
    changefreq: String,
    exclude: Vec<String>,
}

impl Default for SitemapGenerator {
    fn default() -> Self {
        Self {
            options: GeneratorOptions::default(),
            changefreq: ChangeFreq::Weekly.as_str().to_string(),
            exclude: Vec::new(),
        }
    }
}

impl SitemapGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn changefreq(&self) -> ChangeFreq {
        self.changefreq.parse().unwrap_or(ChangeFreq::Weekly)
    }

    /// Sitemap XML for `pages`.
    pub fn render<'p>(&self, pages: impl Iterator<Item = &'p Page>) -> String {
        let changefreq = self.changefreq();
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');
        for page in pages {
            xml.push_str(&SitemapUrl::from_page(page, changefreq).to_xml());
        }
        xml.push_str("</urlset>\n");
        xml
    }
}

impl OptionsHolder for SitemapGenerator {
    fn descriptive_name() -> &'static str {
        "Sitemap"
    }

    fn description() -> &'static str {
        "Lists every HTML page of the site in sitemap.xml."
    }

    fn declare(options: &mut SchemaBuilder<Self>) {
        options
            .inherit(|g| &mut g.options)
            .option(
                OptionSpec::string("changefreq")
                    .default_value("weekly")
                    .describe("Change frequency given for every URL."),
                |g| &mut g.changefreq,
            )
            .option(
                OptionSpec::list("exclude", OptionType::String)
                    .describe("Keys of generators whose pages are left out."),
                |g| &mut g.exclude,
            );
    }

    fn check(&self) -> Result<(), String> {
        self.changefreq.parse::<ChangeFreq>().map(|_| ())
    }
}

impl Generator for SitemapGenerator {
    fn key(&self) -> &str {
        "sitemap"
    }

    fn priority(&self) -> i32 {
        PRIORITY_LATE
    }

    fn generator_options(&self) -> &GeneratorOptions {
        &self.options
    }

    fn start_indexing(&mut self, ctx: &IndexingContext<'_>) -> Result<Vec<Page>, IndexingError> {
        Ok(vec![Page::new(
            "Sitemap",
            self.key(),
            "sitemap.xml",
            ctx.base_url(),
        )])
    }

    fn start_generation(
        &self,
        pages: &[Page],
        ctx: &GenerationContext<'_>,
    ) -> Result<(), GenerationError> {
        let Some(sitemap) = pages.first() else {
            return Ok(());
        };

        let entries = ctx.index().all_pages().filter(|page| {
            page.extension() == Some("html") && !self.exclude.iter().any(|k| k == page.generator())
        });
        let xml = self.render(entries);

        debug!(url = sitemap.url(), "writing sitemap");
        ctx.write_page(sitemap, &xml)?;
        Ok(())
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
