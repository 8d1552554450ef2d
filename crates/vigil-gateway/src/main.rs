//! vigil — a cron-like dispatcher for hosts whose native task scheduler has
//! proven unreliable.
//!
//! The philosophy is "never die": a broken config file, a missing
//! executable, or a hung job must never take the process down, because a
//! dead scheduler means a bricked host that a human has to go fix. Errors
//! are logged and the loop soldiers on.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::info;

mod app;
mod http;

#[derive(Parser, Debug)]
#[command(name = "vigil", version, about = "Never-die task dispatcher")]
struct Args {
    /// Path to the scheduler config file (JSON).
    #[arg(short = 'c', long)]
    config: PathBuf,

    /// Auxiliary config file, overlaid on top of the main one.
    #[arg(long)]
    aux_config: Option<PathBuf>,

    /// Bind address for the trigger/health HTTP listener.
    #[arg(long, default_value = vigil_core::config::DEFAULT_BIND)]
    bind: String,

    /// Port for the trigger/health HTTP listener.
    #[arg(long, default_value_t = vigil_core::config::DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vigil_gateway=info,vigil_scheduler=info,vigil_core=info,tower_http=warn".into()
            }),
        )
        .init();

    let args = Args::parse();

    // On-demand trigger channel: HTTP handlers → dispatch loop.
    let (trigger_tx, trigger_rx) = mpsc::channel::<String>(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatcher = vigil_scheduler::Dispatcher::new(args.config, args.aux_config, trigger_rx);
    let engine = tokio::spawn(dispatcher.run(shutdown_rx));

    let state = Arc::new(app::AppState::new(trigger_tx));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "trigger listener started");

    tokio::select! {
        res = axum::serve(listener, router) => res?,
        _ = tokio::signal::ctrl_c() => info!("ctrl-c received; shutting down"),
    }

    let _ = shutdown_tx.send(true);
    let _ = engine.await;
    info!("exiting");
    Ok(())
}
