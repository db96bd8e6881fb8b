//! Layout rendering stage.
//!
//! Wraps every file that names a layout in that template. Templates see the
//! site metadata, every collection, the file's own metadata and its
//! `contents`.

use std::path::PathBuf;

use serde_json::{Map, Value, json};
use tera::Context;

use crate::build::files::{FileSet, Metadata};
use crate::build::pipeline::{BuildContext, PipelineError, Stage};
use crate::build::render::Renderer;

use super::collections::neighbours;

/// Stage that renders files through their layout template.
///
/// Templates are loaded from `layouts_dir` on every run, so edits to a
/// layout show up on the next rebuild. Files without a layout, and files
/// whose contents are not UTF-8, pass through untouched.
pub struct LayoutStage {
    layouts_dir: PathBuf,
}

impl LayoutStage {
    pub fn new(layouts_dir: PathBuf) -> Self {
        Self { layouts_dir }
    }
}

/// Collections as template data: each entry is the member's metadata plus
/// its `path`, `contents`, and the `previous` / `next` members in collection
/// order (`{path, title}`, or null at either end).
///
/// Taken before any layout renders, so entries hold the pre-layout body.
fn collections_snapshot(files: &FileSet, ctx: &BuildContext) -> Map<String, Value> {
    ctx.collections
        .iter()
        .map(|(name, collection)| {
            let entries = collection
                .paths
                .iter()
                .enumerate()
                .filter_map(|(index, path)| {
                    let record = files.get(path)?;
                    let (previous, next) = neighbours(collection, files, index);
                    let mut entry = record.metadata.clone();
                    entry.insert("path".to_string(), json!(path));
                    entry.insert(
                        "contents".to_string(),
                        json!(String::from_utf8_lossy(&record.contents)),
                    );
                    entry.insert("previous".to_string(), previous);
                    entry.insert("next".to_string(), next);
                    Some(Value::Object(entry))
                })
                .collect();
            (name.clone(), Value::Array(entries))
        })
        .collect()
}

fn template_context(
    globals: &Map<String, Value>,
    metadata: &Metadata,
    path: &str,
    contents: &str,
    live_reload: bool,
) -> Result<Context, PipelineError> {
    let mut data = globals.clone();
    for (key, value) in metadata {
        data.insert(key.clone(), value.clone());
    }
    data.insert("contents".to_string(), json!(contents));
    data.insert("path".to_string(), json!(path));
    data.insert(
        "notesmith".to_string(),
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "live_reload": live_reload,
        }),
    );

    Context::from_value(Value::Object(data)).map_err(|e| PipelineError::Render {
        path: path.to_string(),
        source: e.into(),
    })
}

impl Stage for LayoutStage {
    fn name(&self) -> &'static str {
        "layouts"
    }

    fn process(&self, files: &mut FileSet, ctx: &mut BuildContext) -> Result<(), PipelineError> {
        let targets: Vec<String> = files
            .iter()
            .filter(|(_, record)| record.layout().is_some())
            .filter(|(path, record)| {
                let text = record.text().is_ok();
                if !text {
                    tracing::debug!(path = %path, "not applying layout to binary file");
                }
                text
            })
            .map(|(path, _)| path.clone())
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let renderer = Renderer::new(&self.layouts_dir).map_err(|source| PipelineError::Render {
            path: self.layouts_dir.display().to_string(),
            source,
        })?;

        let collections = collections_snapshot(files, ctx);
        let mut globals = ctx.metadata.clone();
        for (name, entries) in &collections {
            globals.insert(name.clone(), entries.clone());
        }
        globals.insert("collections".to_string(), Value::Object(collections));

        for path in targets {
            let Some(record) = files.get_mut(&path) else {
                continue;
            };

            let layout = match record.layout() {
                Some(Value::String(name)) => name.clone(),
                Some(other) => {
                    return Err(PipelineError::invalid(format!(
                        "{path}: layout must be a string, found {other}"
                    )));
                }
                None => continue,
            };

            let Ok(contents) = record.text() else {
                continue;
            };
            let context =
                template_context(&globals, &record.metadata, &path, contents, ctx.live_reload)?;

            let html = renderer
                .render(&layout, &context)
                .map_err(|source| PipelineError::Render {
                    path: path.clone(),
                    source,
                })?;

            tracing::trace!(path = %path, layout = %layout, "rendered layout");
            record.contents = html.into_bytes();
        }

        Ok(())
    }
}
