//! Markdown compiler using pulldown-cmark.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use quire_core::{PRIORITY_DEFAULT, RawOptions};

use crate::{CompileError, Compiler, escape_html, syntax::SyntaxHighlighter};

/// Compiles Markdown (`md`, `markdown`) to HTML.
///
/// Fenced code blocks are highlighted unless the compile data sets
/// `highlight = false`.
#[derive(Debug, Clone)]
pub struct MarkdownCompiler {
    highlighter: SyntaxHighlighter,
    options: Options,
}

impl Default for MarkdownCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownCompiler {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self {
            highlighter: SyntaxHighlighter::default(),
            options,
        }
    }

    #[must_use]
    pub fn with_highlighter(mut self, highlighter: SyntaxHighlighter) -> Self {
        self.highlighter = highlighter;
        self
    }

    /// Render a Markdown body to HTML.
    pub fn render(&self, input: &str, highlight: bool) -> String {
        let mut html = String::with_capacity(input.len() * 3 / 2);
        let mut code_block: Option<(Option<String>, String)> = None;

        for event in Parser::new_ext(input, self.options) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                    code_block = Some((lang, String::new()));
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some((lang, code)) = code_block.take() {
                        if highlight {
                            html.push_str(&self.highlighter.highlight(&code, lang.as_deref()));
                        } else {
                            html.push_str(&plain_code_block(&code, lang.as_deref()));
                        }
                        html.push('\n');
                    }
                }
                Event::Text(text) => match code_block.as_mut() {
                    Some((_, code)) => code.push_str(&text),
                    None => html.push_str(&escape_html(&text)),
                },
                Event::Code(code) => {
                    html.push_str(&format!("<code>{}</code>", escape_html(&code)));
                }
                Event::SoftBreak => html.push('\n'),
                Event::HardBreak => html.push_str("<br />\n"),
                Event::Start(tag) => html.push_str(&open_tag(&tag)),
                Event::End(tag) => html.push_str(&close_tag(&tag)),
                Event::Html(raw) | Event::InlineHtml(raw) => html.push_str(&raw),
                Event::FootnoteReference(name) => {
                    html.push_str(&format!(
                        "<sup class=\"footnote-ref\"><a href=\"#fn-{name}\">[{name}]</a></sup>"
                    ));
                }
                Event::Rule => html.push_str("<hr />\n"),
                Event::TaskListMarker(checked) => html.push_str(if checked {
                    "<input type=\"checkbox\" checked disabled />"
                } else {
                    "<input type=\"checkbox\" disabled />"
                }),
                Event::InlineMath(math) => {
                    html.push_str(&format!("<span class=\"math inline\">\\({math}\\)</span>"));
                }
                Event::DisplayMath(math) => {
                    html.push_str(&format!("<div class=\"math display\">\\[{math}\\]</div>"));
                }
            }
        }

        html
    }
}

impl Compiler for MarkdownCompiler {
    fn name(&self) -> &str {
        "markdown"
    }

    fn priority(&self) -> i32 {
        PRIORITY_DEFAULT
    }

    fn source_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn output_extension(&self) -> &str {
        "html"
    }

    fn compile(
        &self,
        _extension: &str,
        input: &str,
        data: &RawOptions,
    ) -> Result<String, CompileError> {
        let highlight = data
            .get("highlight")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        Ok(self.render(input, highlight))
    }
}

fn plain_code_block(code: &str, lang: Option<&str>) -> String {
    let class = lang
        .map(|l| format!(" class=\"language-{}\"", escape_html(l)))
        .unwrap_or_default();
    format!("<pre><code{class}>{}</code></pre>", escape_html(code))
}

fn open_tag(tag: &Tag) -> String {
    match tag {
        Tag::Paragraph => "<p>".to_string(),
        Tag::Heading { level, id, .. } => {
            let id_attr = id
                .as_ref()
                .map(|i| format!(" id=\"{}\"", escape_html(i)))
                .unwrap_or_default();
            format!("<h{}{id_attr}>", *level as u8)
        }
        Tag::BlockQuote(_) => "<blockquote>\n".to_string(),
        Tag::List(Some(start)) => format!("<ol start=\"{start}\">\n"),
        Tag::List(None) => "<ul>\n".to_string(),
        Tag::Item => "<li>".to_string(),
        Tag::FootnoteDefinition(name) => format!("<div class=\"footnote\" id=\"fn-{name}\">"),
        Tag::Table(_) => "<table>".to_string(),
        Tag::TableHead => "<thead><tr>".to_string(),
        Tag::TableRow => "<tr>".to_string(),
        Tag::TableCell => "<td>".to_string(),
        Tag::Emphasis => "<em>".to_string(),
        Tag::Strong => "<strong>".to_string(),
        Tag::Strikethrough => "<del>".to_string(),
        Tag::Superscript => "<sup>".to_string(),
        Tag::Subscript => "<sub>".to_string(),
        Tag::Link {
            dest_url, title, ..
        } => format!("<a href=\"{}\"{}>", escape_html(dest_url), title_attr(title)),
        Tag::Image {
            dest_url, title, ..
        } => format!("<img src=\"{}\"{} alt=\"", escape_html(dest_url), title_attr(title)),
        Tag::DefinitionList => "<dl>".to_string(),
        Tag::DefinitionListTitle => "<dt>".to_string(),
        Tag::DefinitionListDefinition => "<dd>".to_string(),
        Tag::CodeBlock(_) | Tag::HtmlBlock | Tag::MetadataBlock(_) => String::new(),
    }
}

fn close_tag(tag: &TagEnd) -> String {
    match tag {
        TagEnd::Paragraph => "</p>\n".to_string(),
        TagEnd::Heading(level) => format!("</h{}>\n", *level as u8),
        TagEnd::BlockQuote(_) => "</blockquote>\n".to_string(),
        TagEnd::List(true) => "</ol>\n".to_string(),
        TagEnd::List(false) => "</ul>\n".to_string(),
        TagEnd::Item => "</li>\n".to_string(),
        TagEnd::FootnoteDefinition => "</div>\n".to_string(),
        TagEnd::Table => "</table>\n".to_string(),
        TagEnd::TableHead => "</tr></thead>\n".to_string(),
        TagEnd::TableRow => "</tr>\n".to_string(),
        TagEnd::TableCell => "</td>".to_string(),
        TagEnd::Emphasis => "</em>".to_string(),
        TagEnd::Strong => "</strong>".to_string(),
        TagEnd::Strikethrough => "</del>".to_string(),
        TagEnd::Superscript => "</sup>".to_string(),
        TagEnd::Subscript => "</sub>".to_string(),
        TagEnd::Link => "</a>".to_string(),
        TagEnd::Image => "\" />".to_string(),
        TagEnd::DefinitionList => "</dl>\n".to_string(),
        TagEnd::DefinitionListTitle => "</dt>\n".to_string(),
        TagEnd::DefinitionListDefinition => "</dd>\n".to_string(),
        TagEnd::CodeBlock | TagEnd::HtmlBlock | TagEnd::MetadataBlock(_) => String::new(),
    }
}

fn title_attr(title: &str) -> String {
    if title.is_empty() {
        String::new()
    } else {
        format!(" title=\"{}\"", escape_html(title))
    }
}
