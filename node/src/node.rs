use anyhow::{Result, Context};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use axie_ledger::LedgerExecutor;
use axie_rpc::RpcServer;

use crate::errors::{NodeError, NodeResult};
use crate::migrations;
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub lock_timeout_ms: i64,
    pub listen_addr: SocketAddr,
    pub shutdown_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            lock_timeout_ms: 1_000,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl NodeConfig {
    /// Reject settings the store or server would misread
    pub fn validate(&self) -> NodeResult<()> {
        // RocksDB reads a negative lock timeout as "wait forever"
        if self.lock_timeout_ms < 0 {
            return Err(NodeError::Configuration(format!(
                "lock_timeout_ms must not be negative, got {}",
                self.lock_timeout_ms
            )));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(NodeError::Configuration("shutdown_timeout must be positive".to_string()));
        }
        Ok(())
    }
}

pub struct Node {
    config: NodeConfig,
    executor: LedgerExecutor<Storage>,
    schema_version: u32,
}

impl Node {
    /// Open storage and bring its schema up to date.
    ///
    /// A migration failure is fatal: the node never serves against a store
    /// whose layout it does not understand.
    pub fn new(config: NodeConfig) -> Result<Self> {
        info!("Initializing node with config: {:?}", config);
        config.validate()?;

        let storage = Storage::new(&config.data_dir, config.lock_timeout_ms)
            .context("Failed to initialize storage")?;

        let schema_version = migrations::run_pending(&storage)
            .context("Failed to run migrations")?;

        Ok(Self {
            config,
            executor: LedgerExecutor::new(Arc::new(storage)),
            schema_version,
        })
    }

    pub fn executor(&self) -> &LedgerExecutor<Storage> {
        &self.executor
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Serve HTTP until SIGINT/SIGTERM, then drain in-flight requests
    pub async fn start(self) -> Result<()> {
        info!("Starting node services");

        let server = RpcServer::new(self.config.listen_addr, self.executor)
            .with_shutdown_timeout(self.config.shutdown_timeout);

        server.start(shutdown_signal()).await?;

        info!("Node shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Shutdown signal received (SIGINT)"),
        _ = terminate => info!("Shutdown signal received (SIGTERM)"),
    }
}
