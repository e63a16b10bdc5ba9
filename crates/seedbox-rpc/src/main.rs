//! Seedbox RPC daemon - serves the session over JSON-RPC and the legacy
//! tag-based protocol.

use anyhow::Result;
use clap::Parser;
use seedbox_core::config::{default_config_dir, default_download_dir};
use seedbox_core::{HttpFetcher, RpcConfig, Session, SessionSettings};
use seedbox_rpc::{start_server, Dispatcher, Registry, ServerOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "seedbox-rpc")]
#[command(about = "RPC server for the seedbox daemon")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = RpcConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = RpcConfig::DEFAULT_HOST)]
    host: String,

    /// Path prefix of the RPC endpoint
    #[arg(long, default_value = RpcConfig::DEFAULT_URL_BASE)]
    url_base: String,

    /// Directory for daemon state such as the installed blocklist
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Default directory for new torrents
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Source URL for blocklist_update
    #[arg(long)]
    blocklist_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn init_logging(debug: bool) {
    // RUST_LOG wins over --debug when set.
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
        return;
    }

    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    info!("Starting seedbox RPC server");

    let config_dir = args.config_dir.unwrap_or_else(default_config_dir);
    let download_dir = match args.download_dir {
        Some(dir) => std::path::absolute(dir)?,
        None => default_download_dir(),
    };
    info!("Config dir: {}", config_dir.display());
    info!("Download dir: {}", download_dir.display());

    let mut settings = SessionSettings::new(config_dir, download_dir);
    if let Some(url) = args.blocklist_url {
        settings.blocklist_url = url;
    }

    let fetcher = Arc::new(HttpFetcher::new()?);
    let session = Arc::new(Mutex::new(Session::new(settings, fetcher)));
    let registry = Arc::new(Registry::standard());
    info!("Registered {} RPC methods", registry.len());

    let dispatcher = Dispatcher::new(registry, session);
    let options = ServerOptions {
        host: args.host,
        port: args.port,
        url_base: args.url_base,
    };
    let (addr, server) = start_server(dispatcher, &options).await?;

    // Intentional stdout for supervisors that read the bound port
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received, exiting");
        }
        _ = server => {
            info!("Server stopped after session close");
        }
    }

    Ok(())
}
