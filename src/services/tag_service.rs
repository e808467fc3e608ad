use tracing::{debug, info};

use crate::db::Database;
use crate::errors::TagError;
use crate::models::{Tag, MAX_TAG_NAME_LENGTH};

/// Trim and lowercase a raw tag name. Returns None when nothing is left.
pub fn normalize_tag_name(raw: &str) -> Option<String> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Normalizes a batch of names, dropping empties and later duplicates while
/// keeping first-seen order. Any name over the length limit rejects the batch.
pub fn normalize_tag_names(raw_names: &[String]) -> Result<Vec<String>, TagError> {
    let mut names: Vec<String> = Vec::with_capacity(raw_names.len());

    for raw in raw_names {
        let Some(name) = normalize_tag_name(raw) else {
            continue;
        };

        let length = name.chars().count();
        if length > MAX_TAG_NAME_LENGTH {
            return Err(TagError::invalid_name(
                name,
                format!("must be at most {} characters, got {}", MAX_TAG_NAME_LENGTH, length),
            ));
        }

        if !names.contains(&name) {
            names.push(name);
        }
    }

    Ok(names)
}

#[derive(Clone)]
pub struct TagService {
    db: Database,
}

impl TagService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Attach every normalized name to the document, creating tags as needed.
    /// Returns the document's full tag set afterwards.
    pub async fn add_tags(&self, document_id: i32, raw_names: &[String]) -> Result<Vec<Tag>, TagError> {
        let mut names = normalize_tag_names(raw_names)?;
        // Concurrent batches touch tag rows in the same order
        names.sort();

        debug!("Adding tags {:?} to document {}", names, document_id);

        let tags = self
            .db
            .add_tags_to_document(document_id, &names)
            .await?
            .ok_or(TagError::DocumentNotFound { id: document_id })?;

        info!("Document {} now has {} tags", document_id, tags.len());
        Ok(tags)
    }

    /// Detach a tag. Not being attached is fine; a missing document or tag is not.
    pub async fn remove_tag(&self, document_id: i32, tag_id: i32) -> Result<(), TagError> {
        if !self.db.document_exists(document_id).await? {
            return Err(TagError::DocumentNotFound { id: document_id });
        }
        if self.db.get_tag(tag_id).await?.is_none() {
            return Err(TagError::TagNotFound { id: tag_id });
        }

        if self.db.detach_tag(document_id, tag_id).await? {
            info!("Removed tag {} from document {}", tag_id, document_id);
        } else {
            debug!("Tag {} was not attached to document {}", tag_id, document_id);
        }

        Ok(())
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, TagError> {
        Ok(self.db.list_tags().await?)
    }

    /// Delete a tag everywhere; documents keep their other tags.
    pub async fn delete_tag(&self, tag_id: i32) -> Result<(), TagError> {
        if !self.db.delete_tag(tag_id).await? {
            return Err(TagError::TagNotFound { id: tag_id });
        }

        info!("Deleted tag {}", tag_id);
        Ok(())
    }
}
