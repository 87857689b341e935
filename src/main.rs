//! Gateway control plane entry point.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tls_gateway::certs::{CertificateCache, CertificateLoader, UnconfiguredSecrets};
use tls_gateway::config::FileConfigStore;
use tls_gateway::orchestrator::Orchestrator;
use tls_gateway::routing::RouteTableProvider;

#[derive(Debug, Parser)]
#[command(name = "tls-gateway", about = "TLS gateway control plane")]
struct Args {
    /// Path to the configuration document.
    #[arg(long, default_value = "gateway.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tls_gateway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!(config = ?args.config, "tls-gateway v0.1.0 starting");

    let store = Arc::new(FileConfigStore::new(&args.config));
    let cache = Arc::new(CertificateCache::new());
    let provider = Arc::new(RouteTableProvider::new());
    let loader = CertificateLoader::new(Arc::new(UnconfiguredSecrets));

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        loader,
        cache.clone(),
        provider.clone(),
    ));
    orchestrator.start().await?;

    // The watcher must stay alive for change events to keep flowing.
    let (_watcher, events) = store.watch()?;

    // A document change landing between the initial reload and the
    // watcher install would otherwise go unseen until the next change.
    orchestrator.reload().await;

    let (shutdown_tx, _) = broadcast::channel(1);
    let orchestrator_shutdown = shutdown_tx.subscribe();
    let orchestrator_task = tokio::spawn(orchestrator.run(events, orchestrator_shutdown));

    tracing::info!(
        snapshot_routes = provider.current().routes.len(),
        "Control plane running; consumers may pull the snapshot and certificate cache"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
    orchestrator_task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
