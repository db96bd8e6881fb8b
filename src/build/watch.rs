//! File watching for automatic rebuilds.
//!
//! Uses `notify-debouncer-full` to watch the source tree, layouts, asset
//! directories and the config file for changes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, new_debouncer_opt,
};

use crate::config::{SiteConfig, WatchConfig};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Watch events
// =============================================================================

/// Events sent from the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Files changed, rebuild needed.
    Changed(Vec<PathBuf>),
    /// Watcher error occurred.
    Error(String),
}

/// Every event that was pending when a rebuild became possible, merged.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub paths: BTreeSet<PathBuf>,
    pub errors: Vec<String>,
}

impl ChangeBatch {
    fn add(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Changed(paths) => self.paths.extend(paths),
            WatchEvent::Error(e) => self.errors.push(e),
        }
    }

    /// Whether the batch calls for a rebuild.
    pub fn needs_rebuild(&self) -> bool {
        !self.paths.is_empty()
    }
}

/// Merge `first` with everything already queued behind it.
///
/// Events that arrive while a build runs pile up in the channel; draining
/// them here turns any number of them into a single follow-up rebuild.
pub fn coalesce(first: WatchEvent, rx: &Receiver<WatchEvent>) -> ChangeBatch {
    let mut batch = ChangeBatch::default();
    batch.add(first);
    while let Ok(event) = rx.try_recv() {
        batch.add(event);
    }
    batch
}

// =============================================================================
// Watched paths
// =============================================================================

/// A path registered with the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub mode: RecursiveMode,
}

/// Everything a site build reads from disk: the source tree, the layouts,
/// each asset directory, any extra `dev.watch.paths`, and the directory
/// holding the config file (non-recursively, to catch config edits).
pub fn watch_targets(config: &SiteConfig, base_path: &Path, config_path: &Path) -> Vec<WatchTarget> {
    let recursive = |path: &Path| WatchTarget {
        path: SiteConfig::resolve(base_path, path),
        mode: RecursiveMode::Recursive,
    };

    let mut targets = vec![recursive(&config.source), recursive(&config.layouts_dir)];
    targets.extend(config.assets.iter().map(|a| recursive(&a.src)));
    targets.extend(config.dev.watch.paths.iter().map(|p| recursive(p)));

    if let Some(parent) = config_path.parent() {
        targets.push(WatchTarget {
            path: parent.to_path_buf(),
            mode: RecursiveMode::NonRecursive,
        });
    }

    targets
}

/// Decides which changed paths matter for a rebuild.
#[derive(Clone)]
pub struct PathFilter {
    /// Watched roots, used to find the site-relative part of a path
    roots: Vec<PathBuf>,
    /// Output directory; writes there must never trigger a rebuild
    destination: PathBuf,
}

impl PathFilter {
    pub fn new(targets: &[WatchTarget], destination: &Path) -> Self {
        Self {
            roots: targets.iter().map(|t| canonical(&t.path)).collect(),
            destination: canonical(destination),
        }
    }

    /// Whether a change at `path` should trigger a rebuild.
    pub fn is_relevant(&self, path: &Path) -> bool {
        if path.starts_with(&self.destination) {
            return false;
        }

        // Only the part below the watched root counts when looking for
        // hidden entries
        let relative = self
            .roots
            .iter()
            .filter_map(|root| path.strip_prefix(root).ok())
            .min_by_key(|rel| rel.components().count())
            .unwrap_or(path);

        !relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

// =============================================================================
// File watcher
// =============================================================================

/// A file watcher that can use either native or polling backend.
pub enum FileWatcher {
    /// Native file system watcher (recommended for local development).
    Native {
        _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
    /// Polling-based watcher (for network filesystems, Docker, etc.).
    Polling {
        _debouncer: Debouncer<PollWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
}

impl FileWatcher {
    /// Create a new file watcher.
    pub fn new(
        config: &WatchConfig,
        targets: &[WatchTarget],
        filter: PathFilter,
    ) -> Result<Self, WatchError> {
        let debounce_timeout = Duration::from_millis(config.debounce_ms);

        let (tx, rx) = mpsc::channel();

        let callback = move |result: DebounceEventResult| match result {
            Ok(events) => {
                let changed: Vec<PathBuf> = events
                    .iter()
                    .filter(|event| is_relevant_event(&event.kind))
                    .flat_map(|event| event.paths.iter())
                    .filter(|path| filter.is_relevant(path))
                    .cloned()
                    .collect();

                if !changed.is_empty() {
                    let _ = tx.send(WatchEvent::Changed(changed));
                }
            }
            Err(errors) => {
                for e in errors {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            }
        };

        if config.poll {
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let notify_config = NotifyConfig::default().with_poll_interval(poll_interval);

            let mut debouncer = new_debouncer_opt::<_, PollWatcher, RecommendedCache>(
                debounce_timeout,
                None,
                callback,
                RecommendedCache::default(),
                notify_config,
            )?;

            add_targets(&mut debouncer, targets)?;

            Ok(FileWatcher::Polling {
                _debouncer: debouncer,
                rx,
            })
        } else {
            let mut debouncer = new_debouncer(debounce_timeout, None, callback)?;

            add_targets(&mut debouncer, targets)?;

            Ok(FileWatcher::Native {
                _debouncer: debouncer,
                rx,
            })
        }
    }

    fn receiver(&self) -> &Receiver<WatchEvent> {
        match self {
            FileWatcher::Native { rx, .. } => rx,
            FileWatcher::Polling { rx, .. } => rx,
        }
    }

    /// Wait for the next change, then merge everything queued behind it.
    ///
    /// Blocks; returns `None` once the watcher has shut down.
    pub fn recv_batch(&self) -> Option<ChangeBatch> {
        let rx = self.receiver();
        let first = rx.recv().ok()?;
        Some(coalesce(first, rx))
    }
}

fn add_targets<W: Watcher, C: notify_debouncer_full::FileIdCache>(
    debouncer: &mut Debouncer<W, C>,
    targets: &[WatchTarget],
) -> Result<(), WatchError> {
    for target in targets {
        if target.path.exists() {
            debouncer.watch(&target.path, target.mode)?;
        } else {
            tracing::debug!(path = %target.path.display(), "not watching missing path");
        }
    }
    Ok(())
}

/// Check if an event kind is relevant for rebuilds.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    )
}
