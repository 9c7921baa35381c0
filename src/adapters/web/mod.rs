//! File Access Service: token-protected HTTP access to the data root.

mod auth;
mod error;
mod handlers;

pub use error::WebError;

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::adapters::fs_catalog::FsCatalog;
use crate::domain::error::TradestatsError;
use crate::domain::settings::ServerSettings;
use crate::ports::catalog_port::CatalogPort;

pub struct AppState {
    pub catalog: Arc<dyn CatalogPort + Send + Sync>,
    pub api_token: String,
}

pub fn build_router(state: AppState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .route("/files", get(handlers::list_files))
        .route("/data/{*path}", get(handlers::data))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ))
        .fallback(handlers::not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Binds `settings.listen` and serves until the process is stopped.
pub async fn serve(settings: &ServerSettings) -> Result<(), TradestatsError> {
    let catalog = FsCatalog::new(settings.data_folder.clone()).with_extension(&settings.extension);
    let router = build_router(AppState {
        catalog: Arc::new(catalog),
        api_token: settings.api_token.clone(),
    });

    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        root = %settings.data_folder.display(),
        "file access service listening"
    );
    axum::serve(listener, router).await?;
    Ok(())
}
