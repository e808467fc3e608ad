use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};

/// Default and maximum page sizes for listings
pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Standard document fields for SELECT queries
pub const DOCUMENT_FIELDS: &str = "id, filename, content, file_size, page_count, created_at";

/// Listing columns; content is left out and the status joined in
pub const LISTING_FIELDS: &str = r#"
    d.id, d.filename, d.file_size, d.page_count, d.created_at, ps.status
"#;

/// A document row without its content, with the status resolved by join.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentListing {
    pub id: i32,
    pub filename: String,
    pub file_size: i64,
    pub page_count: i32,
    pub created_at: DateTime<Utc>,
    /// None when the document has no processing status row
    pub status: Option<String>,
}

/// Optional restrictions for a document listing
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Exact (already normalized) tag name the document must carry
    pub tag: Option<String>,
    /// Case-insensitive substring of the filename or content
    pub text: Option<String>,
}

impl DocumentFilter {
    pub fn with_tag<S: Into<String>>(tag: S) -> Self {
        Self { tag: Some(tag.into()), text: None }
    }

    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self { tag: None, text: Some(text.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub skip: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { skip: 0, limit: DEFAULT_LIST_LIMIT }
    }
}

impl Pagination {
    /// Validates raw query values; `limit` is capped at `MAX_LIST_LIMIT`.
    pub fn from_query(skip: Option<i64>, limit: Option<i64>) -> Result<Self, String> {
        let skip = skip.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if skip < 0 {
            return Err("skip must not be negative".to_string());
        }
        if limit < 0 {
            return Err("limit must not be negative".to_string());
        }
        Ok(Self { skip, limit: limit.min(MAX_LIST_LIMIT) })
    }
}

/// Escapes LIKE metacharacters so `text` matches literally.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends the filter conditions; the query must already end in a WHERE clause.
pub fn apply_document_filter(query: &mut QueryBuilder<Postgres>, filter: &DocumentFilter) {
    if let Some(tag) = &filter.tag {
        query.push(
            " AND EXISTS (SELECT 1 FROM document_tags dt JOIN tags t ON t.id = dt.tag_id \
             WHERE dt.document_id = d.id AND t.name = ",
        );
        query.push_bind(tag.clone());
        query.push(")");
    }

    if let Some(text) = &filter.text {
        let pattern = format!("%{}%", escape_like(text));
        query.push(" AND (d.filename ILIKE ");
        query.push_bind(pattern.clone());
        query.push(r" ESCAPE '\' OR d.content ILIKE ");
        query.push_bind(pattern);
        query.push(r" ESCAPE '\')");
    }
}

/// Applies pagination to a query builder
pub fn apply_pagination(query: &mut QueryBuilder<Postgres>, pagination: Pagination) {
    query.push(" LIMIT ");
    query.push_bind(pagination.limit);
    query.push(" OFFSET ");
    query.push_bind(pagination.skip);
}
