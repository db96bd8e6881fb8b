//! Markdown rendering stage.
//!
//! Renders markdown files to HTML fragments and moves them to an `.html`
//! path, so `posts/hello.md` becomes `posts/hello.html`.

use pulldown_cmark::Options;

use crate::build::files::FileSet;
use crate::build::markdown::{parser_options, render_markdown};
use crate::build::pipeline::{BuildContext, PipelineError, Stage};
use crate::config::{ConfigError, MarkdownConfig};

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Stage that converts markdown files to HTML.
///
/// After this stage the file's contents are an HTML fragment (no page
/// wrapper) and its `toc` field lists the headings found.
pub struct MarkdownStage {
    options: Options,
}

impl MarkdownStage {
    pub fn new(config: &MarkdownConfig) -> Result<Self, ConfigError> {
        let options = parser_options(config).map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(Self { options })
    }
}

/// `posts/hello.md` -> `Some("posts/hello.html")`, other files -> `None`.
fn html_path(path: &str) -> Option<String> {
    let (stem, extension) = path.rsplit_once('.')?;
    if stem.is_empty() || stem.ends_with('/') || extension.contains('/') {
        return None;
    }
    MARKDOWN_EXTENSIONS
        .iter()
        .any(|ext| extension.eq_ignore_ascii_case(ext))
        .then(|| format!("{stem}.html"))
}

impl Stage for MarkdownStage {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn process(&self, files: &mut FileSet, _ctx: &mut BuildContext) -> Result<(), PipelineError> {
        let targets: Vec<(String, String)> = files
            .paths()
            .filter_map(|path| html_path(path).map(|html| (path.to_string(), html)))
            .collect();

        for (path, html_path) in targets {
            let Some(record) = files.get_mut(&path) else {
                continue;
            };

            let markdown = record.text().map_err(|e| {
                PipelineError::invalid(format!("{path} is not valid UTF-8: {e}"))
            })?;
            let output = render_markdown(markdown, self.options);

            record.contents = output.html.into_bytes();
            record.metadata.insert(
                "toc".to_string(),
                serde_json::to_value(&output.toc).unwrap_or_default(),
            );

            files.rename(&path, &html_path)?;
        }

        Ok(())
    }
}
