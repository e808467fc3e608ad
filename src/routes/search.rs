use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    db::documents::Pagination,
    errors::ApiError,
    models::{DocumentResponse, SearchQuery},
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(search_documents))
}

/// Substring search over filenames and extracted text
#[utoipa::path(
    get,
    path = "/search",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching documents in upload order", body = Vec<DocumentResponse>),
        (status = 400, description = "Missing query or negative skip/limit")
    )
)]
pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let text = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Search query must not be empty"))?;
    let pagination = Pagination::from_query(query.skip, query.limit).map_err(ApiError::bad_request)?;

    debug!("Searching documents for '{}'", text);
    let documents = state
        .query_service()
        .search(text, pagination)
        .await
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?;

    Ok(Json(documents))
}
