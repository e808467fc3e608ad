use anyhow::Result;
use sqlx::{Postgres, QueryBuilder};

use super::helpers::{apply_document_filter, apply_pagination, DocumentFilter, DocumentListing, Pagination, LISTING_FIELDS};
use crate::db::Database;

impl Database {
    /// Lists documents in insertion order, without their content.
    pub async fn list_documents(&self, filter: &DocumentFilter, pagination: Pagination) -> Result<Vec<DocumentListing>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(LISTING_FIELDS);
        query.push(
            " FROM documents d LEFT JOIN processing_statuses ps ON ps.document_id = d.id WHERE 1=1",
        );

        apply_document_filter(&mut query, filter);
        query.push(" ORDER BY d.id ASC");
        apply_pagination(&mut query, pagination);

        let rows = query
            .build_query_as::<DocumentListing>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
