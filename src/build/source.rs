use std::path::{Path, PathBuf};

use super::files::{FileRecord, FileSet, normalize_path};
use super::front_matter::{FrontMatterError, parse_front_matter};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("source path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("source path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory entry in {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid front matter in {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: FrontMatterError,
    },
}

// =============================================================================
// Directory walking
// =============================================================================

/// A file found while walking a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFile {
    /// Absolute (or base-joined) path on disk
    pub full_path: PathBuf,
    /// Path relative to the walked root, `/`-separated
    pub relative_path: String,
}

/// Recursively list the files under `root`, skipping hidden entries.
pub fn walk_files(root: &Path) -> Result<Vec<FoundFile>, SourceError> {
    if !root.exists() {
        return Err(SourceError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(SourceError::NotADirectory(root.to_path_buf()));
    }

    let mut found = Vec::new();
    walk_directory(root, Path::new(""), &mut found)?;
    Ok(found)
}

fn walk_directory(
    dir: &Path,
    relative_path: &Path,
    found: &mut Vec<FoundFile>,
) -> Result<(), SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SourceError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| SourceError::ReadEntry {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = entry.path();
        let file_name = entry.file_name();

        // Skip hidden files and directories
        if file_name.to_string_lossy().starts_with('.') {
            continue;
        }

        let item_relative_path = relative_path.join(&file_name);

        if path.is_dir() {
            walk_directory(&path, &item_relative_path, found)?;
        } else if path.is_file() {
            found.push(FoundFile {
                full_path: path,
                relative_path: normalize_path(&item_relative_path),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Source loading
// =============================================================================

/// Read every file under the source root into a fresh file set.
///
/// UTF-8 files have their front matter parsed into metadata and stripped from
/// the contents. Binary files are loaded as-is with empty metadata.
pub async fn load_source(root: &Path) -> Result<FileSet, SourceError> {
    let found = walk_files(root)?;
    let mut files = FileSet::new();

    for file in found {
        let bytes = tokio::fs::read(&file.full_path)
            .await
            .map_err(|source| SourceError::ReadFile {
                path: file.full_path.clone(),
                source,
            })?;

        let record = match std::str::from_utf8(&bytes) {
            Ok(text) => {
                let parsed =
                    parse_front_matter(text).map_err(|source| SourceError::FrontMatter {
                        path: file.full_path.clone(),
                        source,
                    })?;
                FileRecord::with_metadata(parsed.content, parsed.metadata)
            }
            Err(_) => FileRecord::new(bytes),
        };

        files.insert(file.relative_path, record);
    }

    tracing::debug!(root = %root.display(), files = files.len(), "loaded source tree");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_walk_files_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.md", b"home");
        write(dir.path(), "posts/hello.md", b"hi");
        write(dir.path(), ".hidden/secret.md", b"no");
        write(dir.path(), "posts/.DS_Store", b"no");

        let mut paths: Vec<_> = walk_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.relative_path)
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["index.md", "posts/hello.md"]);
    }

    #[test]
    fn test_walk_files_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = walk_files(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, SourceError::PathNotFound(_)));
    }

    #[tokio::test]
    async fn test_load_source_parses_front_matter() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "posts/hello.md",
            b"---\ntitle: Hello\ndraft: true\n---\n# Hi\n",
        );
        write(dir.path(), "images/dot.png", &[0x89, 0x50, 0xff, 0xfe]);

        let files = load_source(dir.path()).await.unwrap();
        assert_eq!(files.len(), 2);

        let post = files.get("posts/hello.md").unwrap();
        assert_eq!(post.metadata["title"], json!("Hello"));
        assert!(post.is_draft());
        assert_eq!(post.contents, b"# Hi\n");

        let image = files.get("images/dot.png").unwrap();
        assert_eq!(image.contents, vec![0x89, 0x50, 0xff, 0xfe]);
        assert!(image.metadata.is_empty());
    }

    #[tokio::test]
    async fn test_load_source_rejects_bad_front_matter() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.md", b"---\n: [\n---\nbody");

        let err = load_source(dir.path()).await.unwrap_err();
        assert!(matches!(err, SourceError::FrontMatter { .. }));
    }
}
