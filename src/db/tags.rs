use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use std::collections::HashMap;
use tracing::debug;

use crate::db::Database;
use crate::models::Tag;

const TAG_FIELDS: &str = "id, name, created_at";

/// A concurrent delete can remove the conflicting row between our insert and
/// the follow-up read; the insert is retried this many times.
const MAX_TAG_UPSERT_ATTEMPTS: usize = 3;

#[derive(FromRow)]
struct DocumentTagRow {
    document_id: i32,
    id: i32,
    name: String,
    created_at: DateTime<Utc>,
}

impl Database {
    /// Returns the tag with this (normalized) name, creating it if needed.
    pub async fn create_or_get_tag(&self, name: &str) -> Result<Tag> {
        let mut conn = self.pool.acquire().await?;
        upsert_tag(&mut *conn, name).await
    }

    pub async fn get_tag(&self, tag_id: i32) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(&format!("SELECT {} FROM tags WHERE id = $1", TAG_FIELDS))
            .bind(tag_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(&format!("SELECT {} FROM tags ORDER BY name", TAG_FIELDS))
            .fetch_all(&self.pool)
            .await?;

        Ok(tags)
    }

    /// Associates a tag with a document. Returns false if it already was.
    pub async fn attach_tag(&self, document_id: i32, tag_id: i32) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        attach_tag_with(&mut *conn, document_id, tag_id).await
    }

    /// Removes an association. Returns false if there was none.
    pub async fn detach_tag(&self, document_id: i32, tag_id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM document_tags WHERE document_id = $1 AND tag_id = $2")
            .bind(document_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a tag and its associations; documents are kept.
    pub async fn delete_tag(&self, tag_id: i32) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM document_tags WHERE tag_id = $1")
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_document_tags(&self, document_id: i32) -> Result<Vec<Tag>> {
        let mut conn = self.pool.acquire().await?;
        document_tags_with(&mut *conn, document_id).await
    }

    /// Gets tags for many documents with a single query
    pub async fn get_tags_for_documents(&self, document_ids: &[i32]) -> Result<HashMap<i32, Vec<Tag>>> {
        if document_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, DocumentTagRow>(
            r#"
            SELECT dt.document_id, t.id, t.name, t.created_at
            FROM document_tags dt
            JOIN tags t ON t.id = dt.tag_id
            WHERE dt.document_id = ANY($1)
            ORDER BY dt.document_id, t.name
            "#,
        )
        .bind(document_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tags: HashMap<i32, Vec<Tag>> = HashMap::new();
        for row in rows {
            tags.entry(row.document_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
                created_at: row.created_at,
            });
        }

        Ok(tags)
    }

    /// Creates-or-gets every name and attaches it to the document, all in one
    /// transaction. Names must already be normalized. Returns the document's
    /// full tag set afterwards, or None if the document does not exist.
    pub async fn add_tags_to_document(&self, document_id: i32, names: &[String]) -> Result<Option<Vec<Tag>>> {
        let mut tx = self.pool.begin().await?;

        let document = sqlx::query_scalar::<_, i32>("SELECT id FROM documents WHERE id = $1 FOR SHARE")
            .bind(document_id)
            .fetch_optional(&mut *tx)
            .await?;

        if document.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        for name in names {
            let tag = upsert_tag(&mut *tx, name).await?;
            let attached = attach_tag_with(&mut *tx, document_id, tag.id).await?;
            debug!(
                "Tag '{}' ({}) on document {}: {}",
                tag.name,
                tag.id,
                document_id,
                if attached { "attached" } else { "already attached" }
            );
        }

        let tags = document_tags_with(&mut *tx, document_id).await?;
        tx.commit().await?;
        Ok(Some(tags))
    }
}

/// Insert-or-read against the unique index on `tags.name`.
async fn upsert_tag(conn: &mut PgConnection, name: &str) -> Result<Tag> {
    for _ in 0..MAX_TAG_UPSERT_ATTEMPTS {
        let inserted = sqlx::query_as::<_, Tag>(&format!(
            "INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO NOTHING RETURNING {}",
            TAG_FIELDS
        ))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(tag) = inserted {
            debug!("Created tag '{}' ({})", tag.name, tag.id);
            return Ok(tag);
        }

        let existing = sqlx::query_as::<_, Tag>(&format!("SELECT {} FROM tags WHERE name = $1", TAG_FIELDS))
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(tag) = existing {
            return Ok(tag);
        }
    }

    Err(anyhow!(
        "Tag '{}' could not be created or read after {} attempts",
        name,
        MAX_TAG_UPSERT_ATTEMPTS
    ))
}

async fn attach_tag_with(conn: &mut PgConnection, document_id: i32, tag_id: i32) -> Result<bool> {
    let result = sqlx::query(
        "INSERT INTO document_tags (document_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(document_id)
    .bind(tag_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn document_tags_with(conn: &mut PgConnection, document_id: i32) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name, t.created_at
        FROM tags t
        JOIN document_tags dt ON t.id = dt.tag_id
        WHERE dt.document_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(document_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(tags)
}
