//! # JSON-RPC 1.0 TCP Server
//!
//! Serves the sample `TestApi` procedures over plain TCP.
//!
//! ```bash
//! cargo run --bin jsonrpc10-server -- --bind 127.0.0.1:3000
//! echo '{"method": "test.add", "params": [7, 8], "id": 1}' | nc 127.0.0.1 3000
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpc10::{Dispatcher, Serializer};
use jsonrpc10_tcp::{ServerConfig, TcpServer, TestApi};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on (overrides the config file)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Namespace the sample procedures are registered under
    #[arg(short, long, default_value = "test")]
    namespace: String,

    /// Accept named (object) params
    #[arg(long)]
    named_params: bool,

    /// Encode results carrying an "error" key as error replies
    #[arg(long)]
    legacy_error_results: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    config.serializer.accept_named_params |= args.named_params;
    config.serializer.legacy_error_results |= args.legacy_error_results;

    let mut dispatcher = Dispatcher::with_serializer(Serializer::from_config(config.serializer.clone()));
    let namespace = Some(args.namespace.as_str()).filter(|ns| !ns.is_empty());
    dispatcher.register_collection(Arc::new(TestApi::new()), namespace);
    info!(procedures = ?dispatcher.procedures(), "Registered procedures");

    let server = TcpServer::new(config, Arc::new(dispatcher));
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Server failed")?;

    Ok(())
}
