// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Wires the proxy together from a [`ProxyConfig`] and runs it.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::api::{router, serve_api};
use crate::cache::{CacheStore, DiskStore, MemoryStore};
use crate::config::{CacheBackend, ProxyConfig};
use crate::gateway::{AlloyGateway, ContractGateway, MemberTable};
use crate::poller::BlockHeightPoller;
use crate::provider::{create_http_provider, ProviderConfig};
use crate::resolver::{Resolver, ResolverConfig};
use crate::service::ContractService;

/// Opens the configured store backend.
pub async fn open_store(config: &ProxyConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match config.cache_backend {
        CacheBackend::Memory => {
            Arc::new(MemoryStore::new().with_max_snapshots(config.max_snapshots))
        }
        CacheBackend::Disk => Arc::new(
            DiskStore::open(&config.cache_path)
                .await?
                .with_max_snapshots(config.max_snapshots),
        ),
    };
    Ok(store)
}

/// Main entry point for the application.
///
/// Builds the gateway, store, resolver and poller from `config`, then serves
/// HTTP until Ctrl-C or SIGTERM. The poller is stopped before returning.
pub async fn run(config: ProxyConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", config.api_port)).await?;

    let provider = create_http_provider(
        ProviderConfig::new(config.rpc_url.clone()).with_logging(config.rpc_logging),
    )?;
    let abi = AlloyGateway::load_abi(&config.abi_path)?;
    let members = MemberTable::from_abi(&abi);
    info!(
        contract = %config.contract_address,
        constants = members.constant_count(),
        functions = members.function_count(),
        "Loaded contract ABI"
    );

    let gateway: Arc<dyn ContractGateway> = Arc::new(
        AlloyGateway::new(provider, config.contract_address, abi).with_timeout(config.rpc_timeout),
    );
    let store = open_store(&config).await?;
    info!(backend = store.name(), "Cache store ready");

    let resolver = Resolver::new(store.clone()).with_config(
        ResolverConfig::default().with_refresh_after_miss(config.refresh_after_miss),
    );
    let service = Arc::new(
        ContractService::new(gateway.clone(), resolver, members).with_chain(config.chain),
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let poller = BlockHeightPoller::new(gateway, store)
        .with_interval(config.poll_interval)
        .spawn(shutdown_tx.subscribe());

    let app = router(service, &config.allowed_origins);
    serve_api(listener, app, shutdown_signal()).await?;

    let _ = shutdown_tx.send(());
    if let Err(e) = poller.await {
        warn!(error = %e, "Block-height poller task ended abnormally");
    }
    info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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

    info!("Shutdown signal received");
}
