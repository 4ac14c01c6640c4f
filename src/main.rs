//! khttpd server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────────────┐
//!                        │                       KHTTPD                       │
//!                        │                                                    │
//!     Client Request     │  ┌─────────┐    ┌──────────┐    ┌──────────────┐   │
//!     ───────────────────┼─▶│   net   │───▶│   http   │───▶│   routing    │   │
//!                        │  │listener │    │  server  │    │ HttpRouter   │   │
//!                        │  └─────────┘    └────┬─────┘    └──────┬───────┘   │
//!                        │                      │ upgrade         │ handler   │
//!                        │                      ▼                 ▼           │
//!                        │               ┌────────────┐   ┌──────────────┐    │
//!                        │               │ websocket  │   │RequestContext│    │
//!                        │               │  session   │   │  (response)  │    │
//!                        │               └────────────┘   └──────────────┘    │
//!                        │                                                    │
//!                        │  ┌──────────────────────────────────────────────┐  │
//!                        │  │           Cross-Cutting Concerns             │  │
//!                        │  │   config · lifecycle · observability         │  │
//!                        │  └──────────────────────────────────────────────┘  │
//!                        └────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use khttpd::config::{load_config, validate_config, ConfigError, ServerConfig};
use khttpd::lifecycle::{wait_for_termination, Shutdown};
use khttpd::net::Listener;
use khttpd::observability::{logging, metrics};
use khttpd::{demo, Server};

#[derive(Debug, Parser)]
#[command(name = "khttpd")]
#[command(about = "HTTP and WebSocket routing server", long_about = None, version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bind address, overrides `listener.bind_address`
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Static file root, overrides `static_files.web_root`
    #[arg(long, value_name = "DIR")]
    web_root: Option<PathBuf>,

    /// Worker threads, overrides `runtime.worker_threads`
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,
}

impl Cli {
    fn load(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(web_root) = &self.web_root {
            config.static_files.web_root = Some(web_root.clone());
        }
        if let Some(workers) = self.workers {
            config.runtime.worker_threads = workers;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init_logging(&config.observability.log_level);

    let worker_threads = config.runtime.effective_worker_threads();
    tracing::info!(worker_threads, "khttpd v{} starting", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = Listener::bind(&config.listener).await?;

    let mut server = Server::new(config);
    demo::register(&mut server)?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_termination().await {
            Ok(name) => {
                tracing::info!(signal = name, "Shutdown signal received");
                signal.trigger();
            }
            Err(err) => tracing::error!(error = %err, "Failed to install signal handlers"),
        }
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
