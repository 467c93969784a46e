use crate::errors::{GatewayError, Result};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use token_ledger::{Ledger, NewUser, TransferRecord, TransferRequest, TxnId, UserId};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub admin_secret: String,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Run a ledger call on the blocking pool; RocksDB and Argon2 both block.
async fn run_blocking<T, F>(state: &AppState, op: F) -> Result<T>
where
    F: FnOnce(&Ledger) -> token_ledger::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let ledger = state.ledger.clone();
    Ok(tokio::task::spawn_blocking(move || op(&ledger)).await??)
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "token-ledger",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> Result<Response> {
    if !state.metrics_enabled {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    let body = state
        .ledger
        .metrics()
        .export()
        .map_err(|e| GatewayError::Internal(format!("Failed to export metrics: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}

/// POST /admin/user
pub async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<NewUser>> {
    let Json(request) = payload?;
    let user = run_blocking(&state, move |ledger| ledger.create_user(&request.admin_secret)).await?;
    Ok(Json(user))
}

/// GET /balance/:user_id
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DataResponse<i64>>> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| GatewayError::BadRequest("Bad userId.".to_string()))?;
    let balance = run_blocking(&state, move |ledger| ledger.get_balance(user_id)).await?;
    Ok(Json(DataResponse { data: balance }))
}

/// GET /txn/:txn_id
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(txn_id): Path<String>,
) -> Result<Json<DataResponse<TransferRecord>>> {
    let txn_id: TxnId = txn_id
        .parse()
        .map_err(|_| GatewayError::BadRequest("Bad txnId.".to_string()))?;
    let record = run_blocking(&state, move |ledger| ledger.get_transaction(txn_id)).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /txn
pub async fn create_transfer(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<DataResponse<TxnId>>> {
    let Json(request) = payload?;
    tracing::debug!(request = ?request, "Transfer requested");

    let txn_id = run_blocking(&state, move |ledger| {
        ledger.create_transfer(
            request.src_user_id,
            request.dst_user_id,
            request.amount,
            &request.password,
        )
    })
    .await?;
    Ok(Json(DataResponse { data: txn_id }))
}

/// Fallback for unknown routes
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
