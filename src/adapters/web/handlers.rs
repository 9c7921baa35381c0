//! HTTP request handlers for the File Access Service.

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::{AppState, WebError};

const FOLDER_LISTING_SUFFIX: &str = "/files";

#[derive(Debug, Serialize)]
pub struct FileListing {
    pub files: Vec<String>,
}

pub async fn list_files(State(state): State<Arc<AppState>>) -> Result<Json<FileListing>, WebError> {
    let files = state.catalog.list_files()?;
    tracing::debug!(count = files.len(), "listed catalog");
    Ok(Json(FileListing { files }))
}

/// `GET /data/{path}`: a file download, or `{folder}/files` for a folder
/// listing when no file of that name exists.
pub async fn data(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, WebError> {
    let path = path.trim_start_matches('/');

    if !state.catalog.exists(path) {
        if let Some(folder) = path.strip_suffix(FOLDER_LISTING_SUFFIX) {
            let files = state.catalog.list_folder(folder)?;
            tracing::debug!(folder, count = files.len(), "listed folder");
            return Ok(Json(FileListing { files }).into_response());
        }
    }

    let bytes = state.catalog.get_file(path)?;
    tracing::info!(path, bytes = bytes.len(), "serving file");
    Ok(attachment(path, bytes))
}

fn attachment(path: &str, bytes: Vec<u8>) -> Response {
    let name = path.rsplit('/').next().unwrap_or(path);
    let content_type = if name.to_lowercase().ends_with(".csv") {
        "text/csv"
    } else {
        "application/octet-stream"
    };
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        name.replace('"', "")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

pub async fn not_found() -> WebError {
    WebError::not_found("not found")
}
