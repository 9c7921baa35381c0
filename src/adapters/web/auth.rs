//! Bearer-token middleware.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{AppState, WebError};
use crate::domain::access::authenticate;

pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if !authenticate(header, &state.api_token) {
        tracing::warn!(
            uri = %request.uri(),
            has_header = header.is_some(),
            "rejected request: missing or invalid token"
        );
        return Err(WebError::unauthorized());
    }
    Ok(next.run(request).await)
}
