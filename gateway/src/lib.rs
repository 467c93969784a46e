//! HTTP surface for the token ledger
//!
//! Thin axum layer: parses requests, calls into [`token_ledger::Ledger`]
//! on the blocking pool and maps error kinds to status codes.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use token_ledger::Ledger;
use tower_http::trace::TraceLayer;

pub mod errors;
pub mod handlers;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>, metrics_enabled: bool) -> Self {
        Self {
            ledger,
            metrics_enabled,
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let admin = Router::new().route("/user", post(handlers::create_user));

    Router::new()
        .nest("/admin", admin)
        .route("/balance/:user_id", get(handlers::get_balance))
        .route("/txn/:txn_id", get(handlers::get_transaction))
        .route("/txn", post(handlers::create_transfer))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
