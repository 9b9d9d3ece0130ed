//! HTTP surface of the ledger.
//!
//! Every endpoint is a `POST` with a JSON body. Decoding failures answer
//! 400, everything the ledger reports answers 500, both as
//! `{"error": "<message>"}`.

mod error;
mod handlers;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::post;
use tokio::net::TcpListener;
use tracing::info;

use crate::application::LedgerService;

pub use error::ApiError;
pub use handlers::{AppState, BalanceRequest, CurrencyQuery, EntryResponse};

/// Build the router with all ledger endpoints.
pub fn router(service: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/user", post(handlers::get_balance))
        .route("/balance/add", post(handlers::deposit))
        .route("/balance/reduce", post(handlers::withdraw))
        .route("/balance/transfer", post(handlers::transfer))
        .route("/info", post(handlers::list_transactions))
        .layer(middleware::from_fn(log_request))
        .with_state(service)
}

/// Serve the API on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, service: Arc<LedgerService>) -> Result<()> {
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    response
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the task is dropped.
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
