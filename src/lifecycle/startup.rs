//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the first tree before accepting traffic
//! - Start background tasks (metrics exporter, tree rebuilder)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: bind and watcher errors are fatal at startup
//! - Listeners start last (traffic only when the tree is ready)
//! - Rebuilds run on the blocking pool and are debounced; a burst of file
//!   events produces one rebuild

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{AppConfig, TreeWatcher};
use crate::discovery::{FsSource, ModuleSource, Registry};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::proxy::ProxyDispatcher;
use crate::routing::RegisteredEntry;
use crate::store::Store;
use crate::tree::Tree;

const REBUILD_DEBOUNCE: Duration = Duration::from_millis(250);

/// Fatal errors while starting or running the server.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to watch route directories: {0}")]
    Watch(#[from] notify::Error),
}

/// Everything needed to build (and rebuild) a tree.
#[derive(Clone)]
pub struct TreeFactory {
    config: Arc<AppConfig>,
    source: Arc<dyn ModuleSource>,
    entries: Vec<RegisteredEntry>,
}

impl TreeFactory {
    /// Filesystem-backed factory, with the reverse proxy when enabled.
    pub fn from_config(config: Arc<AppConfig>, registry: Arc<Registry>) -> Self {
        let source = FsSource::new(registry).with_extensions(config.routes.extensions.clone());

        let mut entries = Vec::new();
        if config.proxy.enabled {
            let store = Store::open(config.proxy.store_path.clone());
            tracing::info!(store = %store.path().display(), priority = config.proxy.priority, "reverse proxy enabled");
            entries.push(ProxyDispatcher::new(Arc::new(store)).entry(config.proxy.priority));
        }

        Self::new(config, Arc::new(source), entries)
    }

    pub fn new(config: Arc<AppConfig>, source: Arc<dyn ModuleSource>, entries: Vec<RegisteredEntry>) -> Self {
        Self {
            config,
            source,
            entries,
        }
    }

    pub fn build(&self) -> Tree {
        let tree = Tree::build(&self.config, self.source.as_ref(), self.entries.clone());
        metrics::record_tree_build(tree.vhost_count());
        tree
    }

    fn watched_paths(&self) -> Vec<PathBuf> {
        let routes = &self.config.routes;
        self.config
            .vhosts
            .dirs
            .iter()
            .chain(&routes.dirs)
            .chain(&routes.use_dirs)
            .cloned()
            .collect()
    }
}

/// Build the tree, bind, and serve until `shutdown` is triggered.
pub async fn run(factory: TreeFactory, shutdown: Shutdown) -> Result<(), ServeError> {
    let config = Arc::clone(&factory.config);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "failed to parse metrics address"
            ),
        }
    }

    let tree = Arc::new(ArcSwap::from_pointee(factory.build()));

    let _watcher = if config.vhosts.watch {
        Some(spawn_rebuilder(factory, Arc::clone(&tree), &shutdown)?)
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| ServeError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    HttpServer::new(tree).run(listener, shutdown.wait()).await?;
    Ok(())
}

/// Watch the tree's directories and swap in a fresh tree after changes.
pub fn spawn_rebuilder(
    factory: TreeFactory,
    tree: Arc<ArcSwap<Tree>>,
    shutdown: &Shutdown,
) -> Result<RecommendedWatcher, ServeError> {
    let (watcher, mut changes) = TreeWatcher::new(factory.watched_paths());
    let handle = watcher.run()?;
    let mut stop = shutdown.subscribe();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.recv() => break,
                change = changes.recv() => {
                    if change.is_none() {
                        break;
                    }
                    tokio::time::sleep(REBUILD_DEBOUNCE).await;
                    while changes.try_recv().is_ok() {}

                    let factory = factory.clone();
                    match tokio::task::spawn_blocking(move || factory.build()).await {
                        Ok(fresh) => {
                            tracing::info!(vhosts = fresh.vhost_count(), "route tree rebuilt");
                            tree.store(Arc::new(fresh));
                        }
                        Err(e) => tracing::error!(
                            severity = "critical",
                            error = %e,
                            "route tree rebuild failed, keeping current tree"
                        ),
                    }
                }
            }
        }
        tracing::debug!("tree rebuilder stopped");
    });

    Ok(handle)
}
