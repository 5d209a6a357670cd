use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::debug;

use axie_ledger::{LedgerError, LedgerStore};

use crate::identity::Identity;
use crate::server::RpcState;
use crate::types::ApiError;

/// `POST /buy-axie`
///
/// The body is validated before storage is touched. A body that cannot be
/// read at all (too large, broken stream) counts as malformed. The purchase
/// itself runs on the blocking pool as a detached task: if the client goes
/// away the transaction still finishes with a commit or a rollback.
pub async fn buy_axie<S>(
    State(state): State<RpcState<S>>,
    Identity(user_id): Identity,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError>
where
    S: LedgerStore + 'static,
{
    let body = body.map_err(|e| LedgerError::MalformedRequest(e.body_text()))?;
    let purchase = state.validator.validate(user_id, &body)?;

    let executor = state.executor.clone();
    let receipt = tokio::task::spawn_blocking(move || executor.execute(&purchase))
        .await
        .map_err(|e| ApiError::Internal(format!("Purchase task failed: {}", e)))??;

    debug!(
        "buy-axie ok for {}: balance={} holdings={}",
        receipt.user_id, receipt.balance, receipt.holdings
    );
    Ok(StatusCode::OK)
}

pub async fn health_check() -> &'static str {
    "OK"
}
