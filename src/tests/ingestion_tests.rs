#[cfg(test)]
mod tests {
    use crate::errors::DocumentError;
    use crate::test_utils::{sample_pdf, TestContext};

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_valid_pdf_is_persisted_with_status() {
        let ctx = TestContext::new().await;
        let ingestion = ctx.state.ingestion_service();
        let pdf = sample_pdf(&["Quarterly report", "Appendix"]);

        let upload = ingestion.validate(Some("report.pdf")).await.unwrap();
        assert_eq!(upload.filename(), "report.pdf");

        let document = ingestion.ingest(upload, &pdf).await.unwrap();
        assert_eq!(document.filename, "report.pdf");
        assert_eq!(document.page_count, 2);
        assert_eq!(document.file_size, pdf.len() as i64);
        assert!(document.content.contains("Quarterly"));
        assert!(ctx.stored_file_exists("report.pdf"));

        let status = ctx.db().get_processing_status(document.id).await.unwrap().unwrap();
        assert_eq!(status.status, "completed");
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_duplicate_filename_rejected_before_write() {
        let ctx = TestContext::new().await;
        let ingestion = ctx.state.ingestion_service();

        ingestion.ingest_bytes(Some("dup.pdf"), &sample_pdf(&["first"])).await.unwrap();
        let err = ingestion
            .ingest_bytes(Some("dup.pdf"), &sample_pdf(&["second"]))
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::DuplicateFilename { .. }));
        assert_eq!(ctx.stored_files(), 1);

        let stored = ctx.state.file_service.read_file("dup.pdf").await.unwrap();
        assert_eq!(stored, sample_pdf(&["first"]));
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_leftover_file_without_document_is_replaced() {
        let ctx = TestContext::new().await;
        std::fs::write(ctx.upload_dir.path().join("leftover.pdf"), b"from a crashed upload").unwrap();
        assert!(!ctx.db().filename_exists("leftover.pdf").await.unwrap());

        let pdf = sample_pdf(&["fresh copy"]);
        let document = ctx
            .state
            .ingestion_service()
            .ingest_bytes(Some("leftover.pdf"), &pdf)
            .await
            .unwrap();

        assert_eq!(document.filename, "leftover.pdf");
        assert!(document.content.contains("fresh"));
        assert_eq!(ctx.state.file_service.read_file("leftover.pdf").await.unwrap(), pdf);
        assert_eq!(ctx.stored_files(), 1);
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_concurrent_duplicate_uploads_store_one_document() {
        let ctx = TestContext::new().await;

        // Both pass validation before either has stored anything
        let first = ctx.state.ingestion_service();
        let second = ctx.state.ingestion_service();
        let upload_a = first.validate(Some("race.pdf")).await.unwrap();
        let upload_b = second.validate(Some("race.pdf")).await.unwrap();

        let pdf = sample_pdf(&["race"]);
        let (a, b) = tokio::join!(first.ingest(upload_a, &pdf), second.ingest(upload_b, &pdf));

        let results = [a, b];
        let created = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(DocumentError::DuplicateFilename { .. })))
            .count();
        assert_eq!(created, 1);
        assert_eq!(conflicts, 1);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE filename = 'race.pdf'")
            .fetch_one(ctx.db().get_pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(ctx.stored_files(), 1);
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_corrupt_pdf_creates_nothing() {
        let ctx = TestContext::new().await;
        let ingestion = ctx.state.ingestion_service();

        let err = ingestion
            .ingest_bytes(Some("corrupt.pdf"), b"%PDF-1.4\n%%garbage%%")
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::Extraction(_)));
        assert!(!ctx.stored_file_exists("corrupt.pdf"));
        assert!(!ctx.db().filename_exists("corrupt.pdf").await.unwrap());

        // The name is free again afterwards
        ingestion.ingest_bytes(Some("corrupt.pdf"), &sample_pdf(&["fixed"])).await.unwrap();
    }
}
