use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures_util::stream::Stream;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::{
    ServeArgs,
    build::{
        Builder, ChangeBatch, FileWatcher, PathFilter, pipeline::stages::LIVE_RELOAD_ENDPOINT,
        watch_targets,
    },
    config::{SiteConfig, base_path_from_config},
};

/// SSE handler for live reload notifications.
async fn live_reload_handler(
    State(tx): State<broadcast::Sender<()>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = tx.subscribe();
    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            match rx.recv().await {
                Ok(_) => {
                    yield Ok(Event::default().event("reload").data("reload"));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Only the latest reload matters
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let (config, config_path) = SiteConfig::load_from_arg(args.config_file.as_deref()).await?;
    let base_path = base_path_from_config(&config_path);

    // Create broadcast channel for live reload
    let (reload_tx, _) = broadcast::channel::<()>(16);

    // The initial build must succeed before anything is served
    tracing::info!("Building site...");
    let builder = Builder::new(config.clone(), base_path.clone())?
        .with_live_reload(config.dev.live_reload)?;
    let result = builder.build().await?;
    tracing::info!("Built {} file(s)", result.files);

    let _watcher_handle = if args.watch {
        let targets = watch_targets(&config, &base_path, &config_path);
        let filter = PathFilter::new(&targets, &result.output_dir);

        match FileWatcher::new(&config.dev.watch, &targets, filter) {
            Ok(watcher) => {
                tracing::info!("Watching for changes...");
                let rebuilder = Rebuilder {
                    builder,
                    config_path: config_path.clone(),
                    reload_tx: reload_tx.clone(),
                    runtime: Handle::current(),
                };
                Some(tokio::task::spawn_blocking(move || {
                    rebuilder.run(std::iter::from_fn(|| watcher.recv_batch()))
                }))
            }
            Err(e) => {
                tracing::warn!("Failed to start file watcher: {}", e);
                None
            }
        }
    } else {
        None
    };

    // Create the static file server
    let serve_dir = ServeDir::new(&result.output_dir).append_index_html_on_directories(true);

    // Build router with SSE endpoint for live reload
    let app = Router::new()
        .route(LIVE_RELOAD_ENDPOINT, get(live_reload_handler))
        .with_state(reload_tx)
        .fallback_service(serve_dir);

    let port = args.port.unwrap_or(config.dev.port);
    let addr: SocketAddr = format!("{}:{}", args.bind, port).parse()?;

    // Determine the URL to display
    let display_host = if args.bind == "0.0.0.0" {
        "localhost"
    } else {
        &args.bind
    };
    let url = format!("http://{}:{}", display_host, port);

    tracing::info!("Serving site at {}", url);
    tracing::info!("Press Ctrl+C to stop");

    if args.open
        && let Err(e) = open::that(&url)
    {
        tracing::warn!("Failed to open browser: {}", e);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Runs rebuilds one at a time on a blocking thread.
///
/// Changes that arrive while a build is running queue up in the watcher and
/// are merged into the next batch, so a burst of edits costs at most one
/// extra build.
struct Rebuilder {
    builder: Builder,
    config_path: PathBuf,
    reload_tx: broadcast::Sender<()>,
    runtime: Handle,
}

impl Rebuilder {
    /// Rebuild once per batch until the batches run out.
    ///
    /// Only a successful build notifies the browsers; after a failure the
    /// destination keeps the last good output.
    fn run(mut self, batches: impl IntoIterator<Item = ChangeBatch>) {
        for batch in batches {
            for error in &batch.errors {
                tracing::warn!("Watch error: {}", error);
            }
            if !batch.needs_rebuild() {
                continue;
            }

            tracing::info!("Detected {} change(s), rebuilding...", batch.paths.len());

            if touches_config(&batch, &self.config_path) {
                self.reload_config();
            }

            match self.runtime.block_on(self.builder.build()) {
                Ok(result) => {
                    tracing::info!("Rebuilt {} file(s)", result.files);
                    // No subscribers is fine
                    let _ = self.reload_tx.send(());
                }
                Err(e) => {
                    tracing::error!("Build error: {}", e);
                }
            }
        }
    }

    /// Rebuild the pipeline from the edited config file.
    ///
    /// On failure the previous pipeline stays in use. Watched paths and the
    /// dev server are not reconfigured.
    fn reload_config(&mut self) {
        let loaded = self
            .runtime
            .block_on(SiteConfig::load_from_arg(Some(self.config_path.as_path())));

        let builder = loaded.map_err(anyhow::Error::from).and_then(|(config, _)| {
            let live_reload = config.dev.live_reload;
            let base_path = base_path_from_config(&self.config_path);
            Ok(Builder::new(config, base_path)?.with_live_reload(live_reload)?)
        });

        match builder {
            Ok(builder) => {
                tracing::info!("Reloaded {}", self.config_path.display());
                self.builder = builder;
            }
            Err(e) => {
                tracing::error!("Config error, keeping previous configuration: {}", e);
            }
        }
    }
}

fn touches_config(batch: &ChangeBatch, config_path: &Path) -> bool {
    let canonical = config_path
        .canonicalize()
        .unwrap_or_else(|_| config_path.to_path_buf());
    batch
        .paths
        .iter()
        .any(|path| path == config_path || path == &canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn changed(path: PathBuf) -> ChangeBatch {
        let mut batch = ChangeBatch::default();
        batch.paths.insert(path);
        batch
    }

    #[test]
    fn test_failed_rebuild_keeps_output_and_skips_reload() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "layouts/post.html", "<main>{{ contents | safe }}</main>");
        write(root, "src/posts/a.md", "---\ntitle: A\n---\nfirst\n");

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let builder = Builder::new(SiteConfig::starter(), root.to_path_buf()).unwrap();
        runtime.block_on(builder.build()).unwrap();
        let before = fs::read_to_string(root.join("build/posts/a.html")).unwrap();

        let (reload_tx, mut reload_rx) = broadcast::channel(16);
        let rebuilder = Rebuilder {
            builder,
            config_path: root.join("notesmith.yaml"),
            reload_tx,
            runtime: runtime.handle().clone(),
        };

        let post = root.join("src/posts/a.md");
        let mut step = 0;
        let batches = std::iter::from_fn(|| {
            step += 1;
            match step {
                1 => {
                    write(root, "src/posts/a.md", "---\nlayout: missing.html\n---\nbroken\n");
                    Some(changed(post.clone()))
                }
                2 => {
                    // The failed build wrote nothing and sent no reload
                    assert_eq!(
                        fs::read_to_string(root.join("build/posts/a.html")).unwrap(),
                        before
                    );
                    assert!(reload_rx.try_recv().is_err());
                    write(root, "src/posts/a.md", "---\ntitle: A\n---\nfixed\n");
                    Some(changed(post.clone()))
                }
                _ => None,
            }
        });
        rebuilder.run(batches);

        assert!(reload_rx.try_recv().is_ok());
        assert!(
            fs::read_to_string(root.join("build/posts/a.html"))
                .unwrap()
                .contains("fixed")
        );
    }

    #[test]
    fn test_touches_config() {
        let mut batch = ChangeBatch::default();
        batch.paths.insert(PathBuf::from("/site/src/a.md"));
        assert!(!touches_config(&batch, Path::new("/site/notesmith.yaml")));

        batch.paths.insert(PathBuf::from("/site/notesmith.yaml"));
        assert!(touches_config(&batch, Path::new("/site/notesmith.yaml")));
    }
}
