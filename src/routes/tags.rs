use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

use crate::{
    errors::TagError,
    models::{MessageResponse, Tag},
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tags", get(list_tags))
        .route("/tags/{tag_id}", delete(delete_tag))
}

/// List every tag by name
#[utoipa::path(
    get,
    path = "/tags",
    tag = "tags",
    responses(
        (status = 200, description = "All tags", body = Vec<Tag>)
    )
)]
pub async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, TagError> {
    let tags = state.tag_service().list_tags().await?;
    Ok(Json(tags))
}

/// Delete a tag and detach it from every document
#[utoipa::path(
    delete,
    path = "/tags/{tag_id}",
    tag = "tags",
    params(
        ("tag_id" = i32, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag deleted", body = MessageResponse),
        (status = 404, description = "Tag not found")
    )
)]
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
) -> Result<Json<MessageResponse>, TagError> {
    state.tag_service().delete_tag(tag_id).await?;
    Ok(Json(MessageResponse::new("Tag deleted")))
}
