//! Pipeline error types.

use std::path::{Path, PathBuf};

use crate::build::files::FileSetError;
use crate::build::render::RenderError;
use crate::build::source::SourceError;

/// Errors that can occur during pipeline processing.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("template rendering error in {path}: {source}")]
    Render { path: String, source: RenderError },

    #[error(transparent)]
    FileSet(#[from] FileSetError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Invalid(String),

    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: &'static str,
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Create an error for malformed input that a stage cannot process.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
