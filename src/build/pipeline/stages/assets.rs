//! Static asset stage.
//!
//! Adds the files of an asset directory to the file set under a destination
//! prefix. One stage is created per configured mapping.

use std::path::{Component, Path, PathBuf};

use crate::build::files::{FileRecord, FileSet, normalize_path};
use crate::build::pipeline::{BuildContext, PipelineError, Stage};
use crate::build::source::walk_files;
use crate::config::ConfigError;

/// Stage that copies an asset directory into the file set.
///
/// Assets skip every content transformation and replace any file already at
/// the same output path. A missing source directory is skipped with a
/// warning.
pub struct AssetStage {
    src: PathBuf,
    dest: String,
}

impl AssetStage {
    /// `src` is the resolved directory on disk; `dest` is relative to the
    /// output root (empty or `.` for the root itself).
    pub fn new(src: PathBuf, dest: &Path) -> Result<Self, ConfigError> {
        let escapes = dest
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ConfigError::Validation(format!(
                "asset destination must be a relative path inside the output directory: {}",
                dest.display()
            )));
        }

        let dest = dest
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect::<PathBuf>();

        Ok(Self {
            src,
            dest: normalize_path(&dest),
        })
    }

    fn target(&self, relative: &str) -> String {
        if self.dest.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.dest, relative)
        }
    }
}

impl Stage for AssetStage {
    fn name(&self) -> &'static str {
        "assets"
    }

    fn process(&self, files: &mut FileSet, _ctx: &mut BuildContext) -> Result<(), PipelineError> {
        if !self.src.is_dir() {
            tracing::warn!(src = %self.src.display(), "asset directory not found, skipping");
            return Ok(());
        }

        let found = walk_files(&self.src)?;
        let count = found.len();
        for file in found {
            let contents = std::fs::read(&file.full_path)
                .map_err(|e| PipelineError::io(&file.full_path, e))?;
            let target = self.target(&file.relative_path);
            if files.insert(target.clone(), FileRecord::new(contents)).is_some() {
                tracing::debug!(path = %target, "asset replaced existing file");
            }
        }

        tracing::debug!(src = %self.src.display(), dest = %self.dest, files = count, "copied assets");
        Ok(())
    }
}
