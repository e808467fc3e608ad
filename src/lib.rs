pub mod config;
pub mod db;
pub mod errors;
pub mod extraction;
pub mod ingestion;
pub mod models;
pub mod routes;
pub mod services;
pub mod swagger;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use config::Config;
use db::Database;
use extraction::PdfExtractor;
use ingestion::DocumentIngestionService;
use services::{DocumentQueryService, FileService, TagService};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    /// Process-wide extraction pool shared by every request
    pub extractor: PdfExtractor,
    pub file_service: FileService,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let extractor = PdfExtractor::new(
            config.extraction_workers,
            Duration::from_secs(config.extraction_timeout_seconds),
        );
        let file_service = FileService::new(&config.upload_dir);

        Self {
            db,
            config,
            extractor,
            file_service,
        }
    }

    pub fn ingestion_service(&self) -> DocumentIngestionService {
        DocumentIngestionService::new(self.db.clone(), self.file_service.clone(), self.extractor.clone())
    }

    pub fn tag_service(&self) -> TagService {
        TagService::new(self.db.clone())
    }

    pub fn query_service(&self) -> DocumentQueryService {
        DocumentQueryService::new(self.db.clone())
    }
}

/// Health check endpoint for monitoring
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up")
    )
)]
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

/// CORS for the configured origins; `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(health_check))
        .merge(routes::documents::router())
        .merge(routes::tags::router())
        .merge(routes::search::router())
        .merge(swagger::create_swagger_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
