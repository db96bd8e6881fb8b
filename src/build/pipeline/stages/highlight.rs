//! Code highlighting stage.

use crate::build::files::{FileRecord, FileSet};
use crate::build::highlight::SyntaxHighlighter;
use crate::build::pipeline::{BuildContext, PipelineError, Stage};
use crate::config::{ConfigError, HighlightConfig};

/// Stage that highlights fenced code blocks in HTML files.
///
/// Blocks with a recognized language are replaced by autumnus output using
/// CSS classes; the matching theme stylesheet is added to the file set when
/// `highlight.stylesheet` is configured.
pub struct HighlightStage {
    highlighter: SyntaxHighlighter,
    stylesheet: Option<(String, String)>,
}

impl HighlightStage {
    pub fn new(config: &HighlightConfig) -> Result<Self, ConfigError> {
        let highlighter = SyntaxHighlighter::new(&config.theme);

        let stylesheet = match &config.stylesheet {
            Some(path) => {
                let css = highlighter.generate_css().ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "unknown highlight theme '{}'",
                        config.theme
                    ))
                })?;
                Some((path.trim_start_matches('/').to_string(), css))
            }
            None => None,
        };

        Ok(Self {
            highlighter,
            stylesheet,
        })
    }
}

impl Stage for HighlightStage {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn process(&self, files: &mut FileSet, _ctx: &mut BuildContext) -> Result<(), PipelineError> {
        let mut highlighted = 0usize;

        for (path, record) in files.iter_mut() {
            if !path.ends_with(".html") {
                continue;
            }
            let Ok(html) = record.text() else {
                continue;
            };
            if let Some(rewritten) = self.highlighter.highlight_html(html) {
                record.contents = rewritten.into_bytes();
                highlighted += 1;
            }
        }
        tracing::debug!(files = highlighted, "highlighted code blocks");

        if let Some((path, css)) = &self.stylesheet {
            files.insert(path.clone(), FileRecord::new(css.clone()));
        }

        Ok(())
    }
}
