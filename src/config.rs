//! Configuration loading and types for notesmith.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for config structures (`types`)
//! - Loading configs from files and the environment (`load`)

mod load;
mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// Re-export all types for convenient access
pub use load::base_path_from_config;
pub use types::{
    AssetMapping, CollectionConfig, DevConfig, HighlightConfig, LayoutRule, MarkdownConfig,
    SiteConfig, SiteInfo, WatchConfig,
};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "notesmith.yaml";

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read environment overrides: {0}")]
    Environment(#[from] config::ConfigError),

    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid pattern '{pattern}' in {context}: {message}")]
    InvalidPattern {
        context: String,
        pattern: String,
        message: String,
    },

    #[error("{0}")]
    Validation(String),
}

impl SiteConfig {
    /// The configuration written by `notesmith init`.
    ///
    /// Posts and notes get the `post.html` layout and are grouped into
    /// date-ordered collections, newest first.
    pub fn starter() -> Self {
        let posts = CollectionConfig {
            pattern: "*posts/*".to_string(),
            sort_by: "date".to_string(),
            reverse: true,
            limit: None,
        };
        let mut collections = BTreeMap::new();
        collections.insert("posts".to_string(), posts.clone());
        collections.insert(
            "lastPosts".to_string(),
            CollectionConfig {
                limit: Some(10),
                ..posts
            },
        );
        collections.insert(
            "notes".to_string(),
            CollectionConfig {
                pattern: "*notes/*".to_string(),
                sort_by: "date".to_string(),
                reverse: true,
                limit: None,
            },
        );

        let asset = |dir: &str| AssetMapping {
            src: PathBuf::from(dir),
            dest: PathBuf::from(dir),
        };

        Self {
            site: SiteInfo {
                title: Some("My Notes".to_string()),
                url: None,
                extra: serde_json::Map::new(),
            },
            source: PathBuf::from("src"),
            destination: PathBuf::from("build"),
            layouts_dir: PathBuf::from("layouts"),
            default_layouts: vec![
                LayoutRule {
                    pattern: "^posts/".to_string(),
                    layout: "post.html".to_string(),
                },
                LayoutRule {
                    pattern: "^notes/".to_string(),
                    layout: "post.html".to_string(),
                },
            ],
            collections,
            assets: vec![asset("assets"), asset("images"), asset("css")],
            markdown: MarkdownConfig::default(),
            highlight: HighlightConfig::default(),
            dev: DevConfig::default(),
        }
    }

    /// Resolve a config-relative path against the config file's directory.
    pub fn resolve(base_path: &Path, path: &Path) -> PathBuf {
        if path.is_relative() {
            base_path.join(path)
        } else {
            path.to_path_buf()
        }
    }
}
