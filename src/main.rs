// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use ledgerstore_server::config::{Config, LogFormat, DEFAULT_LOG_FILTER};
use ledgerstore_server::error::Error;
use ledgerstore_server::ledger::{LedgerWallet, WalletRpcClient};
use ledgerstore_server::reconciler::{LogSettlement, Reconciler};
use ledgerstore_server::state::AppState;
use ledgerstore_server::storage::{RecordStore, CHECKOUTS_BUCKET};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "Service failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
    }
}

async fn run(config: Config) -> Result<(), Error> {
    info!(?config, "Starting ledger store");

    // Open the store once; every component shares this handle
    let store = Arc::new(RecordStore::open(config.db_path(), config.store_secret.clone())?);
    store.health_check()?;

    let ledger: Arc<dyn LedgerWallet> = Arc::new(WalletRpcClient::new(
        &config.wallet_rpc_url,
        config.wallet_credentials(),
    )?);

    let state = AppState::new(store.clone(), ledger.clone());
    match state.ledger.get_address().await {
        Ok(address) => info!(address = %address, "Ledger wallet reachable"),
        Err(e) => warn!(error = %e, "Ledger wallet not reachable yet, reconciler will keep trying"),
    }

    let shutdown = CancellationToken::new();
    let reconciler = Reconciler::new(store.clone(), ledger, Arc::new(LogSettlement))
        .with_interval(config.reconcile_interval);
    let reconciler_task = tokio::spawn(reconciler.run(shutdown.clone()));

    info!(
        pending_checkouts = store.count(CHECKOUTS_BUCKET)?,
        "Ledger store running. Press Ctrl+C to stop."
    );
    wait_for_shutdown_signal().await;

    info!("Shutdown requested");
    shutdown.cancel();
    if let Err(e) = reconciler_task.await {
        warn!(error = %e, "Reconciler task ended abnormally");
    }

    // Last handle closes the database file
    drop(state);
    drop(store);
    info!("Ledger store stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
