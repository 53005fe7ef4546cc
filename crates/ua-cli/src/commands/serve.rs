//! Serve command for running the HTTP API.

use anyhow::{Context, Result};
use clap::Args;
use tokio::net::TcpListener;

use ua_api::{AppState, StaticCredentials};

use super::open_database;
use crate::Config;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind (overrides `server.bind`).
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides `server.port`).
    #[arg(long)]
    pub port: Option<u16>,
}

pub fn run(args: &ServeArgs, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let state = AppState::new(db, StaticCredentials::new(&config.auth), config.stats);
    let bind = args.bind.as_deref().unwrap_or(&config.server.bind);
    let port = args.port.unwrap_or(config.server.port);

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    runtime.block_on(async {
        let listener = TcpListener::bind((bind, port))
            .await
            .with_context(|| format!("failed to bind {bind}:{port}"))?;
        ua_api::serve(listener, state, shutdown_signal())
            .await
            .context("server failed")
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
