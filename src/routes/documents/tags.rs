use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;

use crate::{
    errors::TagError,
    models::{AddTagsRequest, MessageResponse, TagsUpdatedResponse},
    AppState,
};

/// Attach tags to a document, creating any that do not exist yet
#[utoipa::path(
    post,
    path = "/documents/{id}/tags",
    tag = "tags",
    params(
        ("id" = i32, Path, description = "Document ID")
    ),
    request_body = AddTagsRequest,
    responses(
        (status = 200, description = "The document's tags after the update", body = TagsUpdatedResponse),
        (status = 400, description = "A tag name is too long"),
        (status = 404, description = "Document not found")
    )
)]
pub async fn add_document_tags(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<i32>,
    Json(request): Json<AddTagsRequest>,
) -> Result<Json<TagsUpdatedResponse>, TagError> {
    let tags = state.tag_service().add_tags(document_id, &request.tag_names).await?;

    Ok(Json(TagsUpdatedResponse {
        message: "Tags added".to_string(),
        tags,
    }))
}

/// Detach a tag from a document. Detaching a tag that is not attached succeeds.
#[utoipa::path(
    delete,
    path = "/documents/{id}/tags/{tag_id}",
    tag = "tags",
    params(
        ("id" = i32, Path, description = "Document ID"),
        ("tag_id" = i32, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag detached", body = MessageResponse),
        (status = 404, description = "Document or tag not found")
    )
)]
pub async fn remove_document_tag(
    State(state): State<Arc<AppState>>,
    Path((document_id, tag_id)): Path<(i32, i32)>,
) -> Result<Json<MessageResponse>, TagError> {
    state.tag_service().remove_tag(document_id, tag_id).await?;
    Ok(Json(MessageResponse::new("Tag removed")))
}
