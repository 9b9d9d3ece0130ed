use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::application::AppError;

/// Everything a handler can fail with.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request could not be decoded.
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    App(#[from] AppError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::App(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        match &self {
            ApiError::InvalidInput(_) => warn!(%status, error = %message, "rejected request"),
            ApiError::App(AppError::Database(cause)) => {
                error!(%status, error = ?cause, "storage failure")
            }
            ApiError::App(_) => warn!(%status, error = %message, "request failed"),
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
