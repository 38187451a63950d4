//! Cross-origin stream relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                      STREAM RELAY                     │
//!                       │                                                       │
//!   Player request      │  ┌────────────┐   ┌─────────────┐   ┌──────────────┐ │
//!   ────────────────────┼─▶│ middleware │──▶│   request   │──▶│   upstream   │─┼──▶ Origin / CDN
//!   GET ?url= / POST    │  │ CORS, id,  │   │ interpreter │   │   fetcher    │ │
//!   OPTIONS             │  │ limits     │   └─────────────┘   └──────┬───────┘ │
//!                       │  └────────────┘                            │         │
//!   Player response     │        ▲          ┌─────────────┐          │         │
//!   ◀───────────────────┼────────┴──────────│  response   │◀─────────┘         │
//!   + ACAO: *           │                   │ translator  │                    │
//!                       │                   └─────────────┘                    │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use stream_relay::config::{load_config, ConfigWatcher, RelayConfig};
use stream_relay::lifecycle::{spawn_signal_handler, Shutdown};
use stream_relay::net::load_tls_config;
use stream_relay::observability::{logging, metrics};
use stream_relay::RelayServer;

#[derive(Parser)]
#[command(name = "stream-relay")]
#[command(about = "Cross-origin relay for streaming manifests and segments", long_about = None)]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);

    tracing::info!("stream-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        relay_path = %config.relay.path,
        upstream_timeout_secs = config.upstream.timeout_secs,
        max_redirects = config.upstream.max_redirects,
        "Configuration loaded"
    );

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = RelayServer::new(config)?;

    match tls {
        Some(tls) => {
            let tls_config = load_tls_config(&tls).await?;
            server
                .run_tls(bind_address.parse()?, tls_config, config_updates, shutdown.subscribe())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            server
                .run(listener, config_updates, shutdown.subscribe())
                .await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
