use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Maximum length of a normalized tag name, in characters.
pub const MAX_TAG_NAME_LENGTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tag {
    pub id: i32,
    /// Trimmed, lowercase and unique
    pub name: String,
    pub created_at: DateTime<Utc>,
}
