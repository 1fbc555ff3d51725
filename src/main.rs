//! Subscription relayer.
//!
//! Executes pre-signed recurring subscriptions when their contract reports
//! them due, and relays pre-signed status changes, paying gas from a single
//! operator account unlocked on the ledger node.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!   HTTP client   │  http ──▶ registry ──────────────┐                   │
//!   ──────────────┼─▶ │                              ▼                   │
//!                 │   └────▶ relay dispatcher     store (subscriptionList)│
//!                 │               │                  ▲                   │
//!                 │               ▼                  │                   │
//!                 │          tx submitter ◀──── reconciler (every 10s)   │
//!                 │               │                  │                   │
//!                 │               ▼                  ▼                   │
//!                 │            ledger (JSON-RPC, unlocked operator)  ────┼──▶ node
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use subscription_relayer::config::{load_config, read_network_id, RelayConfig};
use subscription_relayer::http::{AppState, HttpServer};
use subscription_relayer::ledger::{
    AbiCatalog, Ledger, ReceiptPolicy, RpcLedger, SubscriptionAbi, TxSubmitter,
};
use subscription_relayer::lifecycle::{wait_for_signal, Shutdown};
use subscription_relayer::observability::{logging, metrics};
use subscription_relayer::store::{KvStore, MemoryKvStore, SubscriptionStore};
use subscription_relayer::subscriptions::Reconciler;

#[derive(Parser)]
#[command(name = "subscription-relayer", version, about = "Subscription reconciliation and meta-transaction relay")]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the network id file from the configuration.
    #[arg(short, long)]
    network_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => RelayConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "subscription-relayer starting");

    match run(config, args.network_file).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RelayConfig, network_file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let network_path = network_file.unwrap_or_else(|| PathBuf::from(&config.network.id_file));
    let network = read_network_id(&network_path)?;
    tracing::info!(network = %network, path = %network_path.display(), "Network id loaded");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let abi = Arc::new(SubscriptionAbi::from_config(&config.contracts.subscription)?);
    let ledger: Arc<dyn Ledger> = Arc::new(RpcLedger::new(config.ledger.clone(), abi.clone())?);
    let catalog = Arc::new(AbiCatalog::load(&config.contracts.abi_files)?);
    if catalog.is_empty() {
        tracing::warn!("No ABI documents configured, /abi lookups will miss");
    } else {
        tracing::info!(documents = catalog.len(), "ABI catalog loaded");
    }

    let kv = match &config.store.snapshot_path {
        Some(path) => MemoryKvStore::load_from_file(Path::new(path))?,
        None => MemoryKvStore::new(None),
    };
    let store = Arc::new(SubscriptionStore::new(
        Arc::new(kv.clone()) as Arc<dyn KvStore>,
        network,
        &config.store,
    ));

    let submitter = TxSubmitter::new(
        ledger.clone(),
        abi,
        config.gas,
        ReceiptPolicy::from(&config.ledger),
    );

    let shutdown = Shutdown::new();

    let reconciler_task = if config.reconciler.enabled {
        let reconciler = Reconciler::new(ledger.clone(), store.clone(), submitter.clone(), &config.reconciler);
        let rx = shutdown.subscribe();
        Some(tokio::spawn(async move { reconciler.run(rx).await }))
    } else {
        tracing::info!("Reconciler disabled");
        None
    };

    let purge_task = {
        let kv = kv.clone();
        let every = Duration::from_secs(config.store.purge_interval_secs);
        let rx = shutdown.subscribe();
        tokio::spawn(async move { kv.run_purge(every, rx).await })
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, network = %network, "Listening for connections");

    let state = AppState::new(ledger, store, submitter, catalog, config.admin.clone());
    let server = HttpServer::new(state, &config.listener);
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server error"),
        Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
        Ok(Ok(())) => {}
    }
    if let Err(e) = purge_task.await {
        tracing::error!(error = %e, "Store purge task failed");
    }
    if let Some(task) = reconciler_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Reconciler task failed");
        }
    }

    kv.save_to_file()?;
    Ok(())
}
