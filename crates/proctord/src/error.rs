use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use proctor_core::payload::PayloadError;

use crate::engine::EngineError;
use crate::reports::ReportError;
use crate::store::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Payload(#[from] PayloadError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Engine(#[from] EngineError),
    #[error("{0}")]
    Report(#[from] ReportError),
    #[error("{0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Payload(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::DuplicateUsername(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            (status, "internal server error").into_response()
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
            (status, self.to_string()).into_response()
        }
    }
}
