use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError},
        Multipart, Path, Query, State,
    },
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        StatusCode,
    },
    response::{Json, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    db::documents::{DocumentFilter, Pagination},
    errors::{ApiError, DocumentError},
    ingestion::MAX_UPLOAD_BYTES,
    models::{
        DocumentDetailResponse, DocumentResponse, DocumentUploadResponse, ListDocumentsQuery, MessageResponse,
    },
    services::tag_service::normalize_tag_name,
    AppState,
};

/// Multipart field carrying the PDF
const FILE_FIELD: &str = "file";

/// Upload a PDF document
#[utoipa::path(
    post,
    path = "/documents",
    tag = "documents",
    request_body(content = String, description = "PDF file in the `file` field", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Document stored and text extracted", body = DocumentUploadResponse),
        (status = 400, description = "Missing or invalid filename, or the PDF could not be processed"),
        (status = 409, description = "A document with this filename already exists"),
        (status = 413, description = "File larger than 52428800 bytes"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>, DocumentError> {
    let ingestion = state.ingestion_service();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let upload = ingestion.validate(field.file_name()).await?;
        let data = read_field_limited(field, MAX_UPLOAD_BYTES).await?;
        info!("Received upload '{}' ({} bytes)", upload.filename(), data.len());

        // Finish (or clean up) even if the client goes away mid-request
        let document = tokio::spawn(async move { ingestion.ingest(upload, &data).await })
            .await
            .map_err(|e| DocumentError::Storage(anyhow::anyhow!("Upload task failed: {}", e)))??;

        return Ok(Json(DocumentUploadResponse {
            id: document.id,
            filename: document.filename,
        }));
    }

    Err(DocumentError::MissingFile)
}

/// Reads a multipart field, refusing to buffer more than `limit` bytes.
async fn read_field_limited(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, DocumentError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > limit {
            return Err(DocumentError::FileTooLarge { max_size: limit });
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn multipart_error(err: MultipartError) -> DocumentError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        DocumentError::FileTooLarge {
            max_size: MAX_UPLOAD_BYTES,
        }
    } else {
        DocumentError::malformed_upload(err.body_text())
    }
}

/// List documents with their status and tags
#[utoipa::path(
    get,
    path = "/documents",
    tag = "documents",
    params(ListDocumentsQuery),
    responses(
        (status = 200, description = "Documents in upload order", body = Vec<DocumentResponse>),
        (status = 400, description = "Negative skip or limit")
    )
)]
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListDocumentsQuery>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let pagination = Pagination::from_query(query.skip, query.limit).map_err(ApiError::bad_request)?;
    let filter = DocumentFilter {
        tag: query.tag.as_deref().and_then(normalize_tag_name),
        text: None,
    };

    let documents = state
        .query_service()
        .list(&filter, pagination)
        .await
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?;

    Ok(Json(documents))
}

/// Get a document including its extracted text
#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "documents",
    params(
        ("id" = i32, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document detail", body = DocumentDetailResponse),
        (status = 404, description = "Document not found")
    )
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<i32>,
) -> Result<Json<DocumentDetailResponse>, DocumentError> {
    let document = state.query_service().get(document_id).await?;
    Ok(Json(document))
}

/// Delete a document, its status, its tag associations and its stored file
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    tag = "documents",
    params(
        ("id" = i32, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document deleted", body = MessageResponse),
        (status = 404, description = "Document not found")
    )
)]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<i32>,
) -> Result<Json<MessageResponse>, DocumentError> {
    let document = state
        .db
        .delete_document(document_id)
        .await
        .map_err(DocumentError::Database)?
        .ok_or_else(|| DocumentError::not_found(document_id))?;

    let path = state.file_service.file_path(&document.filename);
    if !state.file_service.delete_file(&path).await {
        warn!(
            "Document {} deleted but its file {} could not be removed",
            document_id,
            path.display()
        );
    }

    info!("Deleted document {} '{}'", document.id, document.filename);
    Ok(Json(MessageResponse::new("Document deleted")))
}

/// Download the stored PDF
#[utoipa::path(
    get,
    path = "/documents/{id}/download",
    tag = "documents",
    params(
        ("id" = i32, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "PDF file", content_type = "application/pdf"),
        (status = 404, description = "Document or stored file not found")
    )
)]
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<i32>,
) -> Result<Response, DocumentError> {
    let document = state
        .db
        .get_document(document_id)
        .await
        .map_err(DocumentError::Database)?
        .ok_or_else(|| DocumentError::not_found(document_id))?;

    if !state.file_service.file_exists(&document.filename).await {
        warn!("File for document {} is missing from disk", document_id);
        return Err(DocumentError::not_found(document_id));
    }

    let data = state
        .file_service
        .read_file(&document.filename)
        .await
        .map_err(DocumentError::Storage)?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/pdf")
        .header(CONTENT_DISPOSITION, content_disposition(&document.filename))
        .header(CONTENT_LENGTH, data.len().to_string())
        .body(Body::from(data))
        .map_err(|e| DocumentError::Storage(anyhow::anyhow!("Failed to build response: {}", e)))?;

    debug!("Document downloaded: {}", document_id);
    Ok(response)
}

/// Attachment header with characters that cannot appear in a quoted header
/// value replaced.
fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_plain_name() {
        assert_eq!(
            content_disposition("Q3 report.pdf"),
            "attachment; filename=\"Q3 report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_replaces_unsafe_characters() {
        assert_eq!(
            content_disposition("naïve \"quote\".pdf"),
            "attachment; filename=\"na_ve _quote_.pdf\""
        );
    }
}
