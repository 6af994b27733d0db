//! vhostd
//!
//! Serves a tree of routers discovered from directories of handler manifests.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                     VHOSTD                       │
//!   Client Request     │  ┌────────┐   ┌──────────┐   ┌────────────────┐  │
//!   ───────────────────┼─▶│  http  │──▶│   tree   │──▶│ vhost router   │  │
//!                      │  │ server │   │ (by Host)│   │ or default     │  │
//!                      │  └────────┘   └──────────┘   └───────┬────────┘  │
//!                      │                                      ▼           │
//!                      │              ┌──────────────────────────────┐    │
//!                      │              │ priority-ordered stack:      │    │
//!                      │              │ proxy (100) → routes → mounts│────┼──▶ Backend
//!                      │              │ → middleware → 404           │    │
//!                      │              └──────────────────────────────┘    │
//!                      │                                                  │
//!                      │  discovery → validator/resolver → merge → build  │
//!                      │  (startup, and on every watched change)          │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use vhostd::config::{load_config, AppConfig};
use vhostd::lifecycle::{self, signals, Shutdown, TreeFactory};
use vhostd::observability::logging;
use vhostd::store::{ProxyRoute, Store};
use vhostd::Registry;

#[derive(Parser)]
#[command(name = "vhostd")]
#[command(about = "Directory-discovered routing with virtual hosts and a reverse proxy", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the tree and serve it (default)
    Serve,
    /// Build the tree once and print it
    Tree {
        /// Print as JSON instead of an indented dump
        #[arg(long)]
        json: bool,
    },
    /// Manage the reverse proxy route table
    Proxy {
        #[command(subcommand)]
        command: ProxyCommands,
    },
}

#[derive(Subcommand)]
enum ProxyCommands {
    /// List proxied hostnames
    List,
    /// Proxy a hostname to a backend address
    Add {
        external_hostname: String,
        backend_hostname: String,
    },
    /// Stop proxying a hostname
    Remove { external_hostname: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vhostd starting");

    let config = Arc::new(config);
    let registry = Arc::new(Registry::with_builtins());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!(
                bind_address = %config.listener.bind_address,
                route_dirs = ?config.routes.dirs,
                vhost_dirs = ?config.vhosts.dirs,
                "configuration loaded"
            );

            let shutdown = Shutdown::new();
            let trigger = shutdown.clone();
            tokio::spawn(async move {
                signals::shutdown_signal().await;
                trigger.trigger();
            });

            lifecycle::run(TreeFactory::from_config(config, registry), shutdown).await?;
            tracing::info!("shutdown complete");
        }
        Commands::Tree { json } => {
            let tree = TreeFactory::from_config(config, registry).build();
            if json {
                println!("{}", serde_json::to_string_pretty(tree.description())?);
            } else {
                print!("{}", tree.description());
            }
        }
        Commands::Proxy { command } => {
            let store = Store::open(config.proxy.store_path.clone());
            match command {
                ProxyCommands::List => {
                    for route in store.operation(|conn| Ok(conn.list()))? {
                        println!("{} -> {}", route.external_hostname, route.backend_hostname);
                    }
                }
                ProxyCommands::Add {
                    external_hostname,
                    backend_hostname,
                } => {
                    let route = ProxyRoute::new(external_hostname, backend_hostname);
                    let replaced = store.operation(|conn| conn.put(route.clone()))?;
                    if let Some(old) = replaced {
                        println!("replaced {} -> {}", old.external_hostname, old.backend_hostname);
                    }
                    println!("{} -> {}", route.external_hostname, route.backend_hostname);
                }
                ProxyCommands::Remove { external_hostname } => {
                    let removed = store.operation(|conn| conn.remove(&external_hostname))?;
                    println!("removed {}", removed.external_hostname);
                }
            }
        }
    }

    Ok(())
}
