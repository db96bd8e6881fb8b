//! Build context threaded through every stage alongside the file set.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::build::files::Metadata;
use crate::config::SiteInfo;

/// A named, ordered group of files computed by the collections stage.
///
/// Holds paths into the file set, never the records themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
    pub paths: Vec<String>,
}

/// Build-wide state shared between stages of a single run.
///
/// A fresh context is created for every build, so nothing computed here
/// survives into the next rebuild.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Global metadata visible to every template (`site`, ...)
    pub metadata: Metadata,

    /// Collections by name, filled in by the collections stage
    pub collections: BTreeMap<String, Collection>,

    /// Whether pages are being served with live reload
    pub live_reload: bool,
}

impl BuildContext {
    pub fn new(site: &SiteInfo, live_reload: bool) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(
            "site".to_string(),
            serde_json::to_value(site).unwrap_or(Value::Null),
        );
        Self {
            metadata,
            collections: BTreeMap::new(),
            live_reload,
        }
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }
}
