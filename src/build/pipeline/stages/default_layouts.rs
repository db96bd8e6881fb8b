//! Default layout assignment.
//!
//! Files that don't choose a layout in their front matter get one from the
//! first rule whose pattern matches their path.

use serde_json::Value;

use crate::build::files::{FileSet, LAYOUT_KEY};
use crate::build::pattern::PathRegex;
use crate::build::pipeline::{BuildContext, PipelineError, Stage};
use crate::config::{ConfigError, LayoutRule};

/// Stage that fills in missing `layout` fields.
///
/// Rules are tried in order and the first match wins. An existing layout is
/// never overwritten, and files matching no rule keep no layout, so running
/// the stage twice changes nothing.
pub struct LayoutDefaultStage {
    rules: Vec<(PathRegex, String)>,
}

impl LayoutDefaultStage {
    pub fn from_rules(rules: &[LayoutRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let context = format!("default_layouts[{i}]");
                Ok((PathRegex::new(&rule.pattern, &context)?, rule.layout.clone()))
            })
            .collect::<Result<_, ConfigError>>()?;
        Ok(Self { rules })
    }

    fn layout_for(&self, path: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(path))
            .map(|(_, layout)| layout.as_str())
    }
}

impl Stage for LayoutDefaultStage {
    fn name(&self) -> &'static str {
        "default-layouts"
    }

    fn process(&self, files: &mut FileSet, _ctx: &mut BuildContext) -> Result<(), PipelineError> {
        for (path, record) in files.iter_mut() {
            if record.layout().is_some() {
                continue;
            }
            if let Some(layout) = self.layout_for(path) {
                record
                    .metadata
                    .insert(LAYOUT_KEY.to_string(), Value::String(layout.to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::files::FileRecord;
    use serde_json::json;

    fn rules(pairs: &[(&str, &str)]) -> LayoutDefaultStage {
        let rules: Vec<LayoutRule> = pairs
            .iter()
            .map(|(pattern, layout)| LayoutRule {
                pattern: pattern.to_string(),
                layout: layout.to_string(),
            })
            .collect();
        LayoutDefaultStage::from_rules(&rules).unwrap()
    }

    fn with_layout(layout: Value) -> FileRecord {
        let mut record = FileRecord::new("");
        record.metadata.insert(LAYOUT_KEY.to_string(), layout);
        record
    }

    fn run(stage: &LayoutDefaultStage, files: &mut FileSet) {
        stage.process(files, &mut BuildContext::default()).unwrap();
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let stage = rules(&[("^posts/", "post.html"), ("\\.md$", "page.html")]);
        let mut files: FileSet = [
            ("posts/a.md", FileRecord::new("")),
            ("about.md", FileRecord::new("")),
        ]
        .into_iter()
        .collect();

        run(&stage, &mut files);

        assert_eq!(files.get("posts/a.md").unwrap().layout(), Some(&json!("post.html")));
        assert_eq!(files.get("about.md").unwrap().layout(), Some(&json!("page.html")));
    }

    #[test]
    fn test_unmatched_files_keep_no_layout() {
        let stage = rules(&[("^posts/", "post.html")]);
        let mut files: FileSet = [("index.md", FileRecord::new(""))].into_iter().collect();

        run(&stage, &mut files);

        assert!(files.get("index.md").unwrap().layout().is_none());
        assert!(!files.get("index.md").unwrap().metadata.contains_key(LAYOUT_KEY));
    }

    #[test]
    fn test_explicit_layout_is_kept() {
        let stage = rules(&[("^posts/", "post.html")]);
        let mut files: FileSet = [("posts/a.md", with_layout(json!("custom.html")))]
            .into_iter()
            .collect();

        run(&stage, &mut files);

        assert_eq!(
            files.get("posts/a.md").unwrap().layout(),
            Some(&json!("custom.html"))
        );
    }

    #[test]
    fn test_null_layout_counts_as_unset() {
        let stage = rules(&[("^notes/", "post.html")]);
        let mut files: FileSet = [("notes/n.md", with_layout(Value::Null))].into_iter().collect();

        run(&stage, &mut files);

        assert_eq!(files.get("notes/n.md").unwrap().layout(), Some(&json!("post.html")));
    }

    #[test]
    fn test_running_twice_is_idempotent() {
        let stage = rules(&[("^posts/", "post.html"), ("^notes/", "note.html")]);
        let mut files: FileSet = [
            ("posts/a.md", FileRecord::new("")),
            ("notes/b.md", with_layout(json!("custom.html"))),
            ("index.md", FileRecord::new("")),
        ]
        .into_iter()
        .collect();

        run(&stage, &mut files);
        let once = files.clone();
        run(&stage, &mut files);

        assert_eq!(files, once);
    }
}
