use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;

/// Reported when a document has no processing status row.
pub const UNKNOWN_STATUS: &str = "unknown";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub id: i32,
    /// Sanitized basename, unique across all documents
    pub filename: String,
    /// Extracted text of every page in page order
    pub content: String,
    pub file_size: i64,
    pub page_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Values for a document row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub content: String,
    pub file_size: i64,
    pub page_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProcessingStatus {
    pub id: i32,
    pub document_id: i32,
    pub status: String,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Pending,
    Completed,
    Failed,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Pending => "pending",
            ProcessingState::Completed => "completed",
            ProcessingState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingState::Pending),
            "completed" => Ok(ProcessingState::Completed),
            "failed" => Ok(ProcessingState::Failed),
            other => Err(format!("Unknown processing status: {}", other)),
        }
    }
}
