use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::tag::Tag;

/// Returned by a successful upload; content is left out on purpose.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentUploadResponse {
    pub id: i32,
    pub filename: String,
}

/// Listing projection with resolved status and tags
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: i32,
    pub filename: String,
    /// File size in bytes
    pub file_size: i64,
    pub page_count: i32,
    /// Processing status, or "unknown" when none was recorded
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

/// Full document detail including the extracted text
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentDetailResponse {
    pub id: i32,
    pub filename: String,
    pub content: String,
    pub file_size: i64,
    pub page_count: i32,
    pub status: String,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AddTagsRequest {
    pub tag_names: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TagsUpdatedResponse {
    pub message: String,
    /// Every tag on the document after the update
    pub tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDocumentsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Only documents carrying this (normalized) tag name
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Substring matched case-insensitively against filename and content
    pub q: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}
