mod cli;
mod relay;

use crate::cli::Args;
use crate::relay::{router, RelayState};
use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_to_stderr);

    info!(
        listen_addr = %args.listen_addr,
        upstream_url = %args.upstream_url,
        "relay starting"
    );
    let state = RelayState::new(&args.upstream_url).context("invalid relay settings")?;
    let app = router(state);

    let listener = TcpListener::bind(&args.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.listen_addr))?;
    info!(addr = %args.listen_addr, "relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;
    info!("relay shutting down");
    Ok(())
}

fn init_tracing(log_to_stderr: bool) {
    let builder = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    );
    if log_to_stderr {
        builder.with_writer(std::io::stderr).init();
    } else {
        builder.init();
    }
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
