use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{ConfigError, SiteConfig};

use super::files::FileSet;
use super::pipeline::{BuildContext, Pipeline, PipelineError};
use super::source::{SourceError, load_source};

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    /// Number of files written
    pub files: usize,
}

/// Runs complete site builds.
///
/// The pipeline is assembled once, when the builder is created, and reused
/// for every build: serve mode keeps a single builder alive across rebuilds.
pub struct Builder {
    config: SiteConfig,
    /// Base path for resolving relative paths (typically the config file's directory)
    base_path: PathBuf,
    live_reload: bool,
    pipeline: Pipeline,
}

impl Builder {
    pub fn new(config: SiteConfig, base_path: PathBuf) -> Result<Self, BuildError> {
        let pipeline = Pipeline::from_config(&config, &base_path, false)?;
        Ok(Self {
            config,
            base_path,
            live_reload: false,
            pipeline,
        })
    }

    /// Add (or remove) the live reload script injection stage.
    pub fn with_live_reload(mut self, enabled: bool) -> Result<Self, BuildError> {
        if enabled != self.live_reload {
            self.pipeline = Pipeline::from_config(&self.config, &self.base_path, enabled)?;
            self.live_reload = enabled;
        }
        Ok(self)
    }

    pub fn source_dir(&self) -> PathBuf {
        SiteConfig::resolve(&self.base_path, &self.config.source)
    }

    pub fn output_dir(&self) -> PathBuf {
        SiteConfig::resolve(&self.base_path, &self.config.destination)
    }

    /// Run one build: read the source tree, run every stage, then write the
    /// result.
    ///
    /// Nothing is written unless every stage succeeds, so a failed build
    /// leaves the destination exactly as it was.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let started = Instant::now();

        // Step 1: Read the source tree
        let source_dir = self.source_dir();
        let mut files = load_source(&source_dir).await?;
        tracing::info!(
            files = files.len(),
            source = %source_dir.display(),
            "read source files"
        );

        // Step 2: Run the pipeline with a fresh context
        let mut ctx = BuildContext::new(&self.config.site, self.live_reload);
        self.pipeline.run(&mut files, &mut ctx)?;

        // Step 3: Persist
        let output_dir = self.output_dir();
        let written = persist(&files, &output_dir).await?;

        tracing::info!(
            files = written,
            output = %output_dir.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "build finished"
        );

        Ok(BuildResult {
            output_dir,
            files: written,
        })
    }
}

/// Write every record to `output_dir/<path>`, creating parent directories.
///
/// Files already in the output directory that are not part of the set are
/// left alone.
async fn persist(files: &FileSet, output_dir: &Path) -> Result<usize, BuildError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BuildError::Io { path, source }
    };

    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(io_err(output_dir))?;

    for (path, record) in files {
        let output_path = output_dir.join(path);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err(parent))?;
        }
        tokio::fs::write(&output_path, &record.contents)
            .await
            .map_err(io_err(&output_path))?;
    }

    Ok(files.len())
}
