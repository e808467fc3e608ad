use anyhow::Result;
use chrono::Utc;

use super::helpers::DOCUMENT_FIELDS;
use crate::db::Database;
use crate::models::{Document, NewDocument, ProcessingState, ProcessingStatus};

/// Unique constraint guarding document filenames
pub const FILENAME_UNIQUE_CONSTRAINT: &str = "documents_filename_key";

const STATUS_FIELDS: &str = "id, document_id, status, error_message, processed_at";

impl Database {
    /// Inserts a document and its `completed` processing status in one
    /// transaction. The status row is written after the document has its id.
    pub async fn create_document(&self, document: &NewDocument) -> Result<(Document, ProcessingStatus)> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Document>(&format!(
            r#"
            INSERT INTO documents (filename, content, file_size, page_count)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            DOCUMENT_FIELDS
        ))
        .bind(&document.filename)
        .bind(&document.content)
        .bind(document.file_size)
        .bind(document.page_count)
        .fetch_one(&mut *tx)
        .await?;

        let status = sqlx::query_as::<_, ProcessingStatus>(&format!(
            r#"
            INSERT INTO processing_statuses (document_id, status, processed_at)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            STATUS_FIELDS
        ))
        .bind(created.id)
        .bind(ProcessingState::Completed.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created, status))
    }

    pub async fn get_document(&self, document_id: i32) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            DOCUMENT_FIELDS
        ))
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }

    pub async fn document_exists(&self, document_id: i32) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM documents WHERE id = $1)")
            .bind(document_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn filename_exists(&self, filename: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM documents WHERE filename = $1)")
            .bind(filename)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn get_processing_status(&self, document_id: i32) -> Result<Option<ProcessingStatus>> {
        let status = sqlx::query_as::<_, ProcessingStatus>(&format!(
            "SELECT {} FROM processing_statuses WHERE document_id = $1",
            STATUS_FIELDS
        ))
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(status)
    }

    /// Deletes a document together with its status and tag associations.
    /// Returns the deleted row, or None if no document has this id.
    pub async fn delete_document(&self, document_id: i32) -> Result<Option<Document>> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE id = $1 FOR UPDATE",
            DOCUMENT_FIELDS
        ))
        .bind(document_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(document) = existing else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM processing_statuses WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM document_tags WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(document))
    }
}
