//! JSON error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::error::TradestatsError;

/// Body shared by token failures and path escapes.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized access";

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::FORBIDDEN, UNAUTHORIZED_MESSAGE)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl From<TradestatsError> for WebError {
    fn from(err: TradestatsError) -> Self {
        match &err {
            TradestatsError::Unauthorized => Self::unauthorized(),
            TradestatsError::PathEscape { requested } => {
                tracing::warn!(%requested, "rejected path outside the data root");
                Self::unauthorized()
            }
            TradestatsError::NotFound { .. } => Self::not_found(err.to_string()),
            TradestatsError::RowCountMismatch { .. }
            | TradestatsError::UnsupportedCardinality { .. }
            | TradestatsError::NoCommonColumns { .. }
            | TradestatsError::MissingColumn { .. }
            | TradestatsError::NonNumeric { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            TradestatsError::InvalidSelection { .. }
            | TradestatsError::ConfigParse { .. }
            | TradestatsError::ConfigMissing { .. }
            | TradestatsError::ConfigInvalid { .. } => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            TradestatsError::Fetch { .. } => Self::new(StatusCode::BAD_GATEWAY, err.to_string()),
            TradestatsError::Csv { .. } | TradestatsError::Io(_) => {
                tracing::error!(error = %err, "request failed");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
