use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use anyhow::{Result, Context};
use tracing::{info, warn};

use axie_ledger::{LedgerExecutor, LedgerStore, RequestValidator, MAX_PAYLOAD_SIZE};

use crate::handlers::{buy_axie, health_check};

pub struct RpcState<S> {
    pub executor: LedgerExecutor<S>,
    pub validator: Arc<RequestValidator>,
}

impl<S> RpcState<S> {
    pub fn new(executor: LedgerExecutor<S>) -> Self {
        Self {
            executor,
            validator: Arc::new(RequestValidator::new()),
        }
    }
}

impl<S> Clone for RpcState<S> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            validator: self.validator.clone(),
        }
    }
}

pub fn router<S>(state: RpcState<S>) -> Router
where
    S: LedgerStore + 'static,
{
    Router::new()
        .route("/buy-axie", post(buy_axie::<S>))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct RpcServer<S> {
    addr: SocketAddr,
    shutdown_timeout: Duration,
    state: RpcState<S>,
}

impl<S> RpcServer<S>
where
    S: LedgerStore + 'static,
{
    pub fn new(addr: SocketAddr, executor: LedgerExecutor<S>) -> Self {
        Self {
            addr,
            shutdown_timeout: Duration::from_secs(30),
            state: RpcState::new(executor),
        }
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// After that no new connections are accepted and in-flight requests get
    /// `shutdown_timeout` to finish. Running out of time is an error.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("RPC server listening on {}", listener.local_addr()?);

        let (draining_tx, mut draining_rx) = watch::channel(false);
        let signal = async move {
            shutdown.await;
            info!("Draining in-flight requests");
            let _ = draining_tx.send(true);
        };

        let server = axum::serve(listener, router(self.state))
            .with_graceful_shutdown(signal)
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            biased;
            result = &mut server => result?,
            _ = async { let _ = draining_rx.wait_for(|draining| *draining).await; } => {
                match tokio::time::timeout(self.shutdown_timeout, &mut server).await {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!("In-flight requests still running after {:?}", self.shutdown_timeout);
                        anyhow::bail!("Graceful shutdown timed out after {:?}", self.shutdown_timeout);
                    }
                }
            }
        }

        info!("RPC server stopped");
        Ok(())
    }
}
