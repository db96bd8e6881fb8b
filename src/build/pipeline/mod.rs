//! Build pipeline for file processing.
//!
//! The pipeline transforms the in-memory file set through a series of stages:
//! 1. Default layouts (fill in `layout` from path rules)
//! 2. Drafts (drop files flagged `draft`)
//! 3. Markdown rendering (`.md` -> `.html`)
//! 4. Code highlighting
//! 5. Collections (grouped, sorted file lists for templates)
//! 6. Layout rendering
//! 7. Static assets
//! 8. Live reload script injection (serve mode only)
//!
//! A pipeline is assembled once with [`PipelineBuilder`] and cannot be
//! changed afterwards. Every build runs the same stages in the same order.

mod context;
mod error;
pub mod stages;

use std::path::Path;
use std::time::Instant;

pub use context::{BuildContext, Collection};
pub use error::PipelineError;

use crate::build::files::FileSet;
use crate::config::{ConfigError, SiteConfig};
use stages::{
    AssetStage, CollectionsStage, DraftStage, HighlightStage, LayoutDefaultStage, LayoutStage,
    LiveReloadStage, MarkdownStage,
};

/// A stage in the file processing pipeline.
///
/// Stages transform the file set sequentially. Each stage receives the whole
/// set and can add, remove or rewrite files before passing it on.
pub trait Stage: Send + Sync {
    /// Unique name for this stage (used in logs and errors).
    fn name(&self) -> &'static str;

    /// Process the file set through this stage.
    ///
    /// The `ctx` carries build-wide metadata between stages, such as the
    /// collections consumed by the layout stage.
    fn process(&self, files: &mut FileSet, ctx: &mut BuildContext) -> Result<(), PipelineError>;
}

/// Assembles a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stage to the end of the pipeline.
    pub fn stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Add a stage only when `enabled` is true.
    pub fn stage_if<S: Stage + 'static>(self, enabled: bool, stage: S) -> Self {
        if enabled { self.stage(stage) } else { self }
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

/// The file processing pipeline.
///
/// An ordered, immutable list of stages. Build one with
/// [`Pipeline::from_config`] or [`PipelineBuilder`].
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Create the site pipeline described by the configuration.
    ///
    /// Patterns are compiled here, so an invalid regex or glob fails before
    /// any build runs. `base_path` is the directory holding the config file;
    /// `live_reload` adds the script injection stage.
    pub fn from_config(
        config: &SiteConfig,
        base_path: &Path,
        live_reload: bool,
    ) -> Result<Self, ConfigError> {
        let mut builder = Self::builder()
            .stage(LayoutDefaultStage::from_rules(&config.default_layouts)?)
            .stage(DraftStage)
            .stage(MarkdownStage::new(&config.markdown)?)
            .stage(HighlightStage::new(&config.highlight)?)
            .stage(CollectionsStage::from_config(&config.collections)?)
            .stage(LayoutStage::new(SiteConfig::resolve(
                base_path,
                &config.layouts_dir,
            )));

        for mapping in &config.assets {
            builder = builder.stage(AssetStage::new(
                SiteConfig::resolve(base_path, &mapping.src),
                &mapping.dest,
            )?);
        }

        // Last, so HTML copied in from asset directories gets the script too
        Ok(builder.stage_if(live_reload, LiveReloadStage).build())
    }

    /// Run the pipeline on a file set.
    ///
    /// Stops at the first failing stage; the error names that stage.
    pub fn run(&self, files: &mut FileSet, ctx: &mut BuildContext) -> Result<(), PipelineError> {
        for stage in &self.stages {
            let started = Instant::now();
            stage
                .process(files, ctx)
                .map_err(|source| PipelineError::Stage {
                    stage: stage.name(),
                    source: Box::new(source),
                })?;
            tracing::debug!(
                stage = stage.name(),
                files = files.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "stage finished"
            );
        }

        Ok(())
    }

    /// Get the names of all stages in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::files::FileRecord;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Appends its name to every file, so stage order is visible in the output.
    struct Tag(&'static str);

    impl Stage for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process(&self, files: &mut FileSet, _: &mut BuildContext) -> Result<(), PipelineError> {
            for (_, record) in files.iter_mut() {
                record.contents.extend_from_slice(self.0.as_bytes());
            }
            Ok(())
        }
    }

    struct Fail;

    impl Stage for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn process(&self, _: &mut FileSet, _: &mut BuildContext) -> Result<(), PipelineError> {
            Err(PipelineError::invalid("boom"))
        }
    }

    struct Count(Arc<AtomicUsize>);

    impl Stage for Count {
        fn name(&self) -> &'static str {
            "count"
        }

        fn process(&self, _: &mut FileSet, _: &mut BuildContext) -> Result<(), PipelineError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn one_file() -> FileSet {
        [("a.txt", FileRecord::new(""))].into_iter().collect()
    }

    #[test]
    fn test_stages_run_in_order() {
        let pipeline = Pipeline::builder().stage(Tag("1")).stage(Tag("2")).build();
        let mut files = one_file();
        pipeline
            .run(&mut files, &mut BuildContext::default())
            .unwrap();
        assert_eq!(files.get("a.txt").unwrap().contents, b"12");
    }

    #[test]
    fn test_failure_aborts_remaining_stages() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .stage(Count(counter.clone()))
            .stage(Fail)
            .stage(Count(counter.clone()))
            .build();

        let err = pipeline
            .run(&mut one_file(), &mut BuildContext::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Stage { stage: "fail", .. }));
        assert_eq!(err.to_string(), "stage 'fail' failed: boom");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stage_if() {
        let pipeline = Pipeline::builder()
            .stage_if(false, Tag("skipped"))
            .stage_if(true, Tag("kept"))
            .build();
        assert_eq!(pipeline.stage_names(), vec!["kept"]);
    }

    #[test]
    fn test_from_config_stage_order() {
        let config = SiteConfig::starter();
        let pipeline = Pipeline::from_config(&config, Path::new("/site"), false).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "default-layouts",
                "drafts",
                "markdown",
                "highlight",
                "collections",
                "layouts",
                "assets",
                "assets",
                "assets",
            ]
        );

        let serving = Pipeline::from_config(&config, Path::new("/site"), true).unwrap();
        assert_eq!(serving.stage_names().last(), Some(&"live-reload"));
    }

    #[test]
    fn test_starter_config_with_stylesheet() {
        let mut config = SiteConfig::starter();
        config.highlight.stylesheet = Some("css/highlight.css".to_string());
        assert!(Pipeline::from_config(&config, Path::new("/site"), false).is_ok());
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let mut config = SiteConfig::starter();
        config.default_layouts[0].pattern = "(".to_string();
        assert!(matches!(
            Pipeline::from_config(&config, Path::new("/site"), false),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
