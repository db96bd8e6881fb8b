//! Configuration type definitions.
//!
//! This module contains all the data structures used in `notesmith.yaml`.
//! These types are pure data - no I/O or complex logic.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// =============================================================================
// Site configuration
// =============================================================================

/// Root site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site-wide values exposed to templates as `site.*`
    #[serde(default)]
    pub site: SiteInfo,
    /// Directory read at the start of every build
    #[serde(default = "default_source")]
    pub source: PathBuf,
    /// Directory the final file set is written to
    #[serde(default = "default_destination")]
    pub destination: PathBuf,
    /// Directory holding the tera layouts
    #[serde(default = "default_layouts_dir")]
    pub layouts_dir: PathBuf,
    /// Layouts assigned to files that don't pick one, first match wins
    #[serde(default)]
    pub default_layouts: Vec<LayoutRule>,
    /// Named collections made available to templates
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,
    /// Directories copied into the output as-is
    #[serde(default)]
    pub assets: Vec<AssetMapping>,
    #[serde(default)]
    pub markdown: MarkdownConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    /// Development-specific settings (serve, watch, live reload)
    #[serde(default)]
    pub dev: DevConfig,
}

fn default_source() -> PathBuf {
    PathBuf::from("src")
}

fn default_destination() -> PathBuf {
    PathBuf::from("build")
}

fn default_layouts_dir() -> PathBuf {
    PathBuf::from("layouts")
}

/// Site-level information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteInfo {
    pub title: Option<String>,
    pub url: Option<String>,
    /// Arbitrary extra values (available in templates as `site.<key>`)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// Pipeline configuration
// =============================================================================

/// A default layout rule: files whose path matches `pattern` (a regex)
/// get `layout` unless they set one themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutRule {
    pub pattern: String,
    pub layout: String,
}

/// A named collection definition.
///
/// ```yaml
/// collections:
///   lastPosts:
///     pattern: "*posts/*"
///     sort_by: date
///     reverse: true
///     limit: 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Glob matched against output paths (`*` does not cross `/`)
    pub pattern: String,
    /// Metadata field to sort by
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    /// Sort descending instead of ascending
    #[serde(default)]
    pub reverse: bool,
    /// Keep only the first N entries after sorting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

fn default_sort_by() -> String {
    "date".to_string()
}

/// A static asset directory mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetMapping {
    /// Directory to copy, relative to the config file
    pub src: PathBuf,
    /// Destination, relative to the output directory
    pub dest: PathBuf,
}

// =============================================================================
// Markdown configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Extensions to enable for markdown processing
    #[serde(default = "default_markdown_extensions")]
    pub extensions: Vec<String>,
}

fn default_markdown_extensions() -> Vec<String> {
    vec![
        "definition_lists".to_string(),
        "footnotes".to_string(),
        "gfm".to_string(),
        "heading_attributes".to_string(),
        "strikethrough".to_string(),
        "tables".to_string(),
        "tasklists".to_string(),
    ]
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: default_markdown_extensions(),
        }
    }
}

// =============================================================================
// Highlight configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Autumnus theme used for the generated stylesheet
    #[serde(default = "default_highlight_theme")]
    pub theme: String,
    /// Output path for the theme stylesheet; none is written if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<String>,
}

fn default_highlight_theme() -> String {
    "github_dark".to_string()
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: default_highlight_theme(),
            stylesheet: None,
        }
    }
}

// =============================================================================
// Development configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// Port the dev server listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// File watching configuration
    #[serde(default)]
    pub watch: WatchConfig,
    /// Enable live reload in the browser when files change (default: true)
    #[serde(default = "default_live_reload")]
    pub live_reload: bool,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            watch: WatchConfig::default(),
            live_reload: true,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_live_reload() -> bool {
    true
}

/// Configuration for file watching during development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Extra paths to watch, on top of the source, layouts and asset dirs.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Use polling-based watcher instead of native file system events.
    /// Useful for network filesystems, Docker volumes, or other situations
    /// where native events are unreliable.
    #[serde(default)]
    pub poll: bool,
    /// Poll interval in milliseconds (only used if poll=true).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debounce timeout in milliseconds.
    /// Changes within this window are batched together.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            poll: false,
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}
