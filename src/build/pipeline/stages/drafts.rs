//! Draft removal.

use crate::build::files::FileSet;
use crate::build::pipeline::{BuildContext, PipelineError, Stage};

/// Stage that drops every file whose `draft` field is truthy.
///
/// Must run before markdown rendering and collections so drafts are never
/// rendered or listed.
pub struct DraftStage;

impl Stage for DraftStage {
    fn name(&self) -> &'static str {
        "drafts"
    }

    fn process(&self, files: &mut FileSet, _ctx: &mut BuildContext) -> Result<(), PipelineError> {
        let before = files.len();
        files.retain(|path, record| {
            let keep = !record.is_draft();
            if !keep {
                tracing::debug!(path, "skipping draft");
            }
            keep
        });

        let removed = before - files.len();
        if removed > 0 {
            tracing::info!(removed, "skipped draft(s)");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::files::{DRAFT_KEY, FileRecord};
    use serde_json::{Value, json};

    fn flagged(value: Value) -> FileRecord {
        let mut record = FileRecord::new("body");
        record.metadata.insert(DRAFT_KEY.to_string(), value);
        record
    }

    fn sample() -> FileSet {
        [
            ("posts/draft.md", flagged(json!(true))),
            ("posts/published.md", flagged(json!(false))),
            ("posts/plain.md", FileRecord::new("body")),
            ("notes/wip.md", flagged(json!("yes"))),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_removes_drafts() {
        let mut files = sample();
        DraftStage
            .process(&mut files, &mut BuildContext::default())
            .unwrap();

        assert!(!files.contains("posts/draft.md"));
        assert!(!files.contains("notes/wip.md"));
        assert!(files.contains("posts/published.md"));
        assert!(files.contains("posts/plain.md"));
    }

    #[test]
    fn test_survivors_are_untouched() {
        let original = sample();
        let mut files = original.clone();
        DraftStage
            .process(&mut files, &mut BuildContext::default())
            .unwrap();

        for (path, record) in &files {
            assert_eq!(Some(record), original.get(path));
        }
    }

    #[test]
    fn test_running_twice_is_idempotent() {
        let mut files = sample();
        let mut ctx = BuildContext::default();
        DraftStage.process(&mut files, &mut ctx).unwrap();
        let once = files.clone();
        DraftStage.process(&mut files, &mut ctx).unwrap();
        assert_eq!(files, once);
    }
}
