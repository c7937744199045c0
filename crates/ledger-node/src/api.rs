use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{
    BalanceSummary, BlockRecord, BlockStore, Ledger, LedgerError, ValidationReport,
};
use ledger_storage::sync_chain;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    ledger: Arc<Mutex<Ledger>>,
    store: Arc<dyn BlockStore>,
}

impl AppState {
    pub fn new(ledger: Ledger, store: Arc<dyn BlockStore>) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            store,
        }
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, ApiError> {
        self.ledger
            .lock()
            .map_err(|_| ApiError::Internal("ledger lock poisoned".into()))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("{0}")]
    Internal(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(err) => {
                let status = match err {
                    LedgerError::BlockIndexOutOfRange { .. } | LedgerError::UnknownAccount(_) => {
                        StatusCode::NOT_FOUND
                    }
                    LedgerError::InsufficientFunds { .. }
                    | LedgerError::BalanceOverflow { .. }
                    | LedgerError::SelfTransfer(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize)]
pub struct Head {
    pub height: usize,
    pub tip_hash: String,
    pub pending: usize,
    pub difficulty: u32,
}

#[derive(Deserialize)]
pub struct AccountIn {
    pub name: String,
    pub balance: u64,
}

#[derive(Serialize)]
pub struct AccountOut {
    pub id: String,
}

#[derive(Deserialize)]
pub struct TxIn {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct TxOut {
    pub accepted: bool,
    pub sealed_block: Option<usize>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/chain/head", get(head))
        .route("/chain/validate", get(validate))
        .route("/accounts", post(open_account))
        .route("/tx", post(submit_tx))
        .route("/blocks/{index}", get(block))
        .route("/balances/{index}", get(balances))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn head(State(state): State<AppState>) -> Result<Json<Head>, ApiError> {
    let ledger = state.ledger()?;
    let chain = ledger.chain();
    Ok(Json(Head {
        height: chain.len(),
        tip_hash: hex::encode(chain.tip().hash()),
        pending: chain.pending().len(),
        difficulty: chain.difficulty(),
    }))
}

async fn open_account(
    State(state): State<AppState>,
    Json(account): Json<AccountIn>,
) -> Result<Json<AccountOut>, ApiError> {
    let id = state.ledger()?.open_account(account.name, account.balance);
    Ok(Json(AccountOut { id }))
}

/// Mining can run for a long time, so the transfer is applied on the blocking pool.
async fn submit_tx(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> Result<Json<TxOut>, ApiError> {
    let sealed = tokio::task::spawn_blocking(move || -> Result<Option<usize>, ApiError> {
        let mut ledger = state.ledger()?;
        let sealed = ledger.transfer(&tx.from, &tx.to, tx.amount)?;
        if sealed.is_some() {
            sync_chain(state.store.as_ref(), ledger.chain())?;
        }
        Ok(sealed)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    if let Some(index) = sealed {
        info!(index, "block persisted");
    }
    Ok(Json(TxOut {
        accepted: true,
        sealed_block: sealed,
    }))
}

/// Validates a snapshot taken under the lock so submissions are not held up.
async fn validate(State(state): State<AppState>) -> Result<Json<ValidationReport>, ApiError> {
    let snapshot = state.ledger()?.chain().clone();
    let report = tokio::task::spawn_blocking(move || snapshot.validate())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    for violation in &report.violations {
        warn!(kind = violation.kind(), index = ?violation.index(), "{violation}");
    }
    Ok(Json(report))
}

async fn block(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<BlockRecord>, ApiError> {
    let ledger = state.ledger()?;
    Ok(Json(ledger.chain().block(index)?.to_record()))
}

async fn balances(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<BTreeMap<String, BalanceSummary>>, ApiError> {
    let ledger = state.ledger()?;
    Ok(Json(ledger.balance_report(index)?))
}
