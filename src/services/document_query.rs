use tracing::debug;

use crate::db::documents::{DocumentFilter, DocumentListing, Pagination};
use crate::db::Database;
use crate::errors::DocumentError;
use crate::models::{DocumentDetailResponse, DocumentResponse, Tag, UNKNOWN_STATUS};

/// Read-side projections over documents, their statuses and tags.
#[derive(Clone)]
pub struct DocumentQueryService {
    db: Database,
}

impl DocumentQueryService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// One listing query plus one tag query, however many documents match.
    pub async fn list(
        &self,
        filter: &DocumentFilter,
        pagination: Pagination,
    ) -> Result<Vec<DocumentResponse>, DocumentError> {
        let listings = self
            .db
            .list_documents(filter, pagination)
            .await
            .map_err(DocumentError::Database)?;

        let ids: Vec<i32> = listings.iter().map(|listing| listing.id).collect();
        let mut tags = self
            .db
            .get_tags_for_documents(&ids)
            .await
            .map_err(DocumentError::Database)?;

        debug!(
            "Listed {} documents (skip {}, limit {}, filter {:?})",
            listings.len(),
            pagination.skip,
            pagination.limit,
            filter
        );

        Ok(listings
            .into_iter()
            .map(|listing| {
                let document_tags = tags.remove(&listing.id).unwrap_or_default();
                into_response(listing, document_tags)
            })
            .collect())
    }

    pub async fn get(&self, document_id: i32) -> Result<DocumentDetailResponse, DocumentError> {
        let document = self
            .db
            .get_document(document_id)
            .await
            .map_err(DocumentError::Database)?
            .ok_or(DocumentError::NotFound { id: document_id })?;

        let status = self
            .db
            .get_processing_status(document_id)
            .await
            .map_err(DocumentError::Database)?;

        let tags = self
            .db
            .get_document_tags(document_id)
            .await
            .map_err(DocumentError::Database)?;

        let (status, error_message, processed_at) = match status {
            Some(status) => (status.status, status.error_message, status.processed_at),
            None => (UNKNOWN_STATUS.to_string(), None, None),
        };

        Ok(DocumentDetailResponse {
            id: document.id,
            filename: document.filename,
            content: document.content,
            file_size: document.file_size,
            page_count: document.page_count,
            status,
            error_message,
            processed_at,
            created_at: document.created_at,
            tags,
        })
    }

    /// Case-insensitive substring search over filenames and extracted text.
    pub async fn search(&self, text: &str, pagination: Pagination) -> Result<Vec<DocumentResponse>, DocumentError> {
        self.list(&DocumentFilter::with_text(text), pagination).await
    }
}

fn into_response(listing: DocumentListing, tags: Vec<Tag>) -> DocumentResponse {
    DocumentResponse {
        id: listing.id,
        filename: listing.filename,
        file_size: listing.file_size,
        page_count: listing.page_count,
        status: listing.status.unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        created_at: listing.created_at,
        tags,
    }
}
