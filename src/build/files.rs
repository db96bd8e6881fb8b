//! In-memory file set threaded through the pipeline.
//!
//! Every stage reads and rewrites a [`FileSet`]: a map from a source-relative
//! path (always `/`-separated) to a [`FileRecord`] holding the file's bytes and
//! its metadata.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::Path;

use serde_json::Value;

/// Metadata attached to a file (front matter plus fields added by stages).
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key holding the template name.
pub const LAYOUT_KEY: &str = "layout";

/// Metadata key flagging unpublished content.
pub const DRAFT_KEY: &str = "draft";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FileSetError {
    #[error("no file at '{0}'")]
    Missing(String),

    #[error("cannot move '{from}' to '{to}': a file already exists there")]
    Occupied { from: String, to: String },
}

// =============================================================================
// File record
// =============================================================================

/// A single file flowing through the pipeline.
///
/// `contents` starts as the raw source (with front matter stripped) and is
/// rewritten in place as stages transform it, e.g. markdown into HTML.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileRecord {
    pub contents: Vec<u8>,
    pub metadata: Metadata,
}

impl FileRecord {
    pub fn new(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: contents.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(contents: impl Into<Vec<u8>>, metadata: Metadata) -> Self {
        Self {
            contents: contents.into(),
            metadata,
        }
    }

    /// The layout field, if one is set to anything other than `null`.
    pub fn layout(&self) -> Option<&Value> {
        self.metadata.get(LAYOUT_KEY).filter(|v| !v.is_null())
    }

    /// Whether the record is flagged as a draft.
    pub fn is_draft(&self) -> bool {
        self.metadata.get(DRAFT_KEY).is_some_and(is_truthy)
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.contents)
    }
}

/// Loose truthiness for metadata flags.
///
/// `null`, `false`, `0` and `""` are falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// =============================================================================
// File set
// =============================================================================

/// All files of one build, keyed by relative path.
///
/// Iteration is in ascending path order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSet {
    files: BTreeMap<String, FileRecord>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut FileRecord> {
        self.files.get_mut(path)
    }

    /// Insert a record, returning the one it replaced.
    pub fn insert(&mut self, path: impl Into<String>, record: FileRecord) -> Option<FileRecord> {
        self.files.insert(path.into(), record)
    }

    /// Keep only the records for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &FileRecord) -> bool) {
        self.files.retain(|path, record| keep(path, record));
    }

    /// Move a record to a new path. Fails if the target path is taken.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), FileSetError> {
        if from == to {
            return Ok(());
        }
        if self.files.contains_key(to) {
            return Err(FileSetError::Occupied {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let record = self
            .files
            .remove(from)
            .ok_or_else(|| FileSetError::Missing(from.to_string()))?;
        self.files.insert(to.to_string(), record);
        Ok(())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FileRecord> {
        self.files.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, FileRecord> {
        self.files.iter_mut()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = (&'a String, &'a FileRecord);
    type IntoIter = btree_map::Iter<'a, String, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

impl<P: Into<String>> FromIterator<(P, FileRecord)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (P, FileRecord)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(|(p, r)| (p.into(), r)).collect(),
        }
    }
}

/// Turn a relative filesystem path into a file set key.
/// `posts\hello.md` -> `posts/hello.md`
pub fn normalize_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
