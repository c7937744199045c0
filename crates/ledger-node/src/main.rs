mod api;
mod config;

use anyhow::Context;
use clap::Parser;
use config::{Args, NodeConfig};
use ledger_core::{BlockStore, Chain, Ledger};
use ledger_storage::{sled_store::SledStore, sync_chain};
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn, Level};

/// Reloads the stored chain, or mines a fresh genesis when the store is empty.
/// A stored chain that fails validation is refused rather than extended.
fn open_ledger(config: &NodeConfig, store: &SledStore) -> anyhow::Result<Ledger> {
    let records = store.load_all()?;
    if records.is_empty() {
        let ledger = Ledger::new(config.chain.clone())?;
        sync_chain(store, ledger.chain())?;
        info!(hash = %ledger.chain().tip().hash_hex(), "genesis block created");
        return Ok(ledger);
    }

    let chain = Chain::from_records(config.chain.clone(), records)?;
    let report = chain.validate();
    for violation in &report.violations {
        warn!(kind = violation.kind(), index = ?violation.index(), "{violation}");
    }
    if let Err(violation) = report.into_result() {
        anyhow::bail!("stored chain failed validation: {violation}");
    }
    info!(height = chain.len(), "stored chain loaded and validated");
    Ok(Ledger::with_chain(chain))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = NodeConfig::resolve(&args)?;
    info!(
        difficulty = config.chain.difficulty,
        batch_size = config.chain.batch_size,
        max_attempts = ?config.chain.mining.max_attempts,
        parallel = config.chain.mining.parallel,
        "chain configuration"
    );

    let store = Arc::new(SledStore::open(config.data_dir.join("blocks"))?);
    let ledger = open_ledger(&config, &store)?;
    let app = api::router(api::AppState::new(ledger, store.clone()));

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen))?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.flush()?;
    Ok(())
}
