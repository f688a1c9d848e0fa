use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use relaypost_core::Relay;
use relaypost_server::{run_server, ServerConfig, ServerError};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "relaypost-server", about = "Host/client relay over WebSocket")]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "RELAYPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Listening endpoint, host:port.
    #[arg(long)]
    bind: Option<String>,

    /// Application ids must be below this bound.
    #[arg(long)]
    max_apps: Option<i64>,

    /// Concurrent connections allowed per IP address.
    #[arg(long)]
    max_connections_per_ip: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig, ServerError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(max_apps) = self.max_apps {
            config.max_apps = max_apps;
        }
        if let Some(limit) = self.max_connections_per_ip {
            config.max_connections_per_ip = limit;
        }
        Ok(config)
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = cli.server_config()?;
    info!(version = env!("CARGO_PKG_VERSION"), "relaypost starting");

    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind.clone(),
            source,
        })?;
    let relay = Arc::new(Relay::new(config.relay_config()));

    tokio::select! {
        _ = run_server(listener, relay, config.max_connections_per_ip) => {}
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }
    Ok(())
}
