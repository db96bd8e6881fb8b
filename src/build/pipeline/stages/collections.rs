//! Collection grouping stage.
//!
//! Groups files into named, sorted lists (`posts`, `lastPosts`, ...) that
//! the layout stage exposes to templates.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::build::files::{FileSet, Metadata};
use crate::build::pattern::PathGlob;
use crate::build::pipeline::{BuildContext, Collection, PipelineError, Stage};
use crate::config::{CollectionConfig, ConfigError};

/// Metadata key listing the collections a file belongs to.
pub const COLLECTION_KEY: &str = "collection";

struct CollectionDef {
    name: String,
    pattern: PathGlob,
    sort_by: String,
    reverse: bool,
    limit: Option<usize>,
}

/// Stage that computes every configured collection.
///
/// Members are the files whose path matches the collection's glob, sorted by
/// a metadata field. Sorting is stable and ties keep ascending path order,
/// whether or not the collection is reversed.
pub struct CollectionsStage {
    collections: Vec<CollectionDef>,
}

impl CollectionsStage {
    pub fn from_config(config: &BTreeMap<String, CollectionConfig>) -> Result<Self, ConfigError> {
        let collections = config
            .iter()
            .map(|(name, def)| {
                Ok(CollectionDef {
                    name: name.clone(),
                    pattern: PathGlob::new(&def.pattern, &format!("collections.{name}"))?,
                    sort_by: def.sort_by.clone(),
                    reverse: def.reverse,
                    limit: def.limit,
                })
            })
            .collect::<Result<_, ConfigError>>()?;
        Ok(Self { collections })
    }

    fn compute(&self, def: &CollectionDef, files: &FileSet) -> Collection {
        // File set iteration is path-ordered, so a stable sort keeps ties by path
        let mut members: Vec<(&str, Option<&Value>)> = files
            .iter()
            .filter(|(path, _)| def.pattern.is_match(path))
            .map(|(path, record)| (path.as_str(), record.metadata.get(&def.sort_by)))
            .collect();

        members.sort_by(|(_, a), (_, b)| {
            let ordering = compare_keys(*a, *b);
            if def.reverse {
                ordering.reverse()
            } else {
                ordering
            }
        });

        if let Some(limit) = def.limit {
            members.truncate(limit);
        }

        Collection {
            name: def.name.clone(),
            paths: members
                .into_iter()
                .map(|(path, _)| path.to_string())
                .collect(),
        }
    }
}

impl Stage for CollectionsStage {
    fn name(&self) -> &'static str {
        "collections"
    }

    fn process(&self, files: &mut FileSet, ctx: &mut BuildContext) -> Result<(), PipelineError> {
        for def in &self.collections {
            let collection = self.compute(def, files);
            tracing::debug!(
                collection = %collection.name,
                members = collection.paths.len(),
                "computed collection"
            );

            for path in &collection.paths {
                if let Some(record) = files.get_mut(path) {
                    add_membership(&mut record.metadata, &collection.name);
                }
            }

            ctx.collections.insert(collection.name.clone(), collection);
        }

        Ok(())
    }
}

fn add_membership(metadata: &mut Metadata, name: &str) {
    let entry = metadata
        .entry(COLLECTION_KEY)
        .or_insert_with(|| Value::Array(Vec::new()));
    match entry {
        Value::Array(names) => {
            if !names.iter().any(|n| n.as_str() == Some(name)) {
                names.push(Value::String(name.to_string()));
            }
        }
        // An author-set scalar is kept as the first entry
        other => {
            let existing = other.take();
            *other = Value::Array(vec![existing, Value::String(name.to_string())]);
        }
    }
}

/// The members on either side of `index` in collection order, each as a
/// `{path, title}` object, or null past either end.
///
/// Returns `(previous, next)`.
pub fn neighbours(collection: &Collection, files: &FileSet, index: usize) -> (Value, Value) {
    let link = |at: Option<usize>| {
        at.and_then(|i| collection.paths.get(i))
            .and_then(|path| {
                let record = files.get(path)?;
                let title = record.metadata.get("title").cloned().unwrap_or(Value::Null);
                Some(json!({ "path": path, "title": title }))
            })
            .unwrap_or(Value::Null)
    };
    (link(index.checked_sub(1)), link(index.checked_add(1)))
}

/// Rank of a value kind: missing < bool < number < string < array/object.
fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
    }
}

/// Total order over sort keys.
///
/// Values of different kinds order by kind; within a kind, booleans, numbers
/// and strings use their natural order (ISO dates sort chronologically as
/// strings). Arrays and objects compare equal to each other.
fn compare_keys(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}
