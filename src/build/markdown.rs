//! Markdown rendering with heading anchors and TOC extraction.

use std::collections::HashSet;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use serde::Serialize;

use super::highlight::html_escape;
use crate::config::MarkdownConfig;

#[derive(thiserror::Error, Debug)]
pub enum MarkdownError {
    #[error("invalid markdown extension: {0}")]
    InvalidExtension(String),
}

/// Result of rendering markdown, containing both HTML and table of contents.
pub struct MarkdownOutput {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// A table of contents entry for the current page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// The heading text
    pub text: String,
    /// The heading id (for anchor links)
    pub id: String,
    /// The heading level (1-6)
    pub level: u8,
}

/// Translate configured extension names into parser options.
pub fn parser_options(markdown_config: &MarkdownConfig) -> Result<Options, MarkdownError> {
    let mut options = Options::empty();
    for extension in &markdown_config.extensions {
        match extension.as_str() {
            "definition_lists" => options.insert(Options::ENABLE_DEFINITION_LIST),
            "footnotes" => options.insert(Options::ENABLE_FOOTNOTES),
            "gfm" => options.insert(Options::ENABLE_GFM),
            "heading_attributes" => options.insert(Options::ENABLE_HEADING_ATTRIBUTES),
            "strikethrough" => options.insert(Options::ENABLE_STRIKETHROUGH),
            "tables" => options.insert(Options::ENABLE_TABLES),
            "tasklists" => options.insert(Options::ENABLE_TASKLISTS),
            other => return Err(MarkdownError::InvalidExtension(other.to_string())),
        }
    }
    Ok(options)
}

/// A heading being captured until its end tag.
struct HeadingState<'a> {
    level: HeadingLevel,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    inner: Vec<Event<'a>>,
    text: String,
}

/// Render markdown to HTML using pulldown-cmark.
///
/// Code blocks are left as `<pre><code class="language-*">` for the
/// highlight stage. Headings get a unique id and a permalink anchor.
pub fn render_markdown(markdown: &str, options: Options) -> MarkdownOutput {
    let parser = Parser::new_ext(markdown, options);

    let mut heading: Option<HeadingState> = None;
    let mut used_heading_ids: HashSet<String> = HashSet::new();
    let mut toc_entries: Vec<TocEntry> = Vec::new();
    let mut events: Vec<Event> = Vec::new();

    for event in parser {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                heading = Some(HeadingState {
                    level,
                    id: id.map(|id| id.to_string()),
                    classes: classes.iter().map(|c| c.to_string()).collect(),
                    attrs: attrs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.as_ref().map(|v| v.to_string())))
                        .collect(),
                    inner: Vec::new(),
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(state) = heading.take() {
                    let html = render_heading(state, &mut used_heading_ids, &mut toc_entries);
                    events.push(Event::Html(html.into()));
                }
            }
            event => match heading.as_mut() {
                Some(state) => {
                    if let Event::Text(text) | Event::Code(text) = &event {
                        state.text.push_str(text);
                    }
                    state.inner.push(event);
                }
                None => events.push(event),
            },
        }
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    MarkdownOutput {
        html: html_output,
        toc: toc_entries,
    }
}

fn render_heading(
    state: HeadingState,
    used_heading_ids: &mut HashSet<String>,
    toc_entries: &mut Vec<TocEntry>,
) -> String {
    // Explicit ids ({#id}) win; otherwise generate a unique one from the text
    let id = match state.id {
        Some(id) => id,
        None => {
            let base_id = slugify(&state.text);
            let mut id = base_id.clone();
            let mut suffix = 1;
            while used_heading_ids.contains(&id) {
                id = format!("{}-{}", base_id, suffix);
                suffix += 1;
            }
            id
        }
    };
    used_heading_ids.insert(id.clone());

    toc_entries.push(TocEntry {
        text: state.text.clone(),
        id: id.clone(),
        level: state.level as u8,
    });

    let class_attr = if state.classes.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", html_escape(&state.classes.join(" ")))
    };

    let extra_attrs = state
        .attrs
        .iter()
        .map(|(k, v)| match v {
            Some(val) => format!(" {}=\"{}\"", k, html_escape(val)),
            None => format!(" {}", k),
        })
        .collect::<String>();

    let mut inner_html = String::new();
    html::push_html(&mut inner_html, state.inner.into_iter());

    let permalink = format!(
        "<a class=\"header-anchor\" href=\"#{}\" aria-label=\"Link to this heading\">#</a>",
        id
    );
    format!(
        "<h{level} id=\"{id}\"{class_attr}{extra_attrs}>{inner_html} {permalink}</h{level}>\n",
        level = state.level as usize,
        id = html_escape(&id),
    )
}

/// Convert a string to a slug suitable for use as an HTML id.
fn slugify(s: &str) -> String {
    s.to_lowercase()
        .replace(' ', "-")
        .replace(|c: char| !c.is_alphanumeric() && c != '-', "")
}
