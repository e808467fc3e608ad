use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AddTagsRequest, DocumentDetailResponse, DocumentResponse, DocumentUploadResponse, MessageResponse,
        ProcessingState, Tag, TagsUpdatedResponse,
    },
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Document endpoints
        crate::routes::documents::upload_document,
        crate::routes::documents::list_documents,
        crate::routes::documents::get_document,
        crate::routes::documents::delete_document,
        crate::routes::documents::download_document,
        // Tag endpoints
        crate::routes::documents::add_document_tags,
        crate::routes::documents::remove_document_tag,
        crate::routes::tags::list_tags,
        crate::routes::tags::delete_tag,
        // Search endpoints
        crate::routes::search::search_documents,
        crate::health_check,
    ),
    components(
        schemas(
            DocumentUploadResponse, DocumentResponse, DocumentDetailResponse, MessageResponse,
            AddTagsRequest, TagsUpdatedResponse, Tag, ProcessingState
        )
    ),
    tags(
        (name = "documents", description = "PDF upload, listing and retrieval"),
        (name = "tags", description = "Tagging of documents"),
        (name = "search", description = "Substring search over extracted text"),
        (name = "health", description = "Liveness"),
    ),
    info(
        title = "docproc API",
        version = "0.1.0",
        description = "PDF document storage with text extraction and tagging"
    )
)]
pub struct ApiDoc;

pub fn create_swagger_router() -> Router<Arc<AppState>> {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
