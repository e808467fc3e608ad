use axum::{extract::DefaultBodyLimit, routing::{delete, get, post}, Router};
use std::sync::Arc;

use crate::ingestion::MAX_UPLOAD_BYTES;
use crate::AppState;

pub mod crud;
pub mod tags;

pub use crud::*;
pub use tags::*;

/// Room for multipart framing on top of the largest accepted file
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", post(upload_document).get(list_documents))
        .route("/documents/{id}", get(get_document).delete(delete_document))
        .route("/documents/{id}/download", get(download_document))
        .route("/documents/{id}/tags", post(add_document_tags))
        .route("/documents/{id}/tags/{tag_id}", delete(remove_document_tag))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES))
}
