#[cfg(test)]
mod tests {
    use crate::errors::TagError;
    use crate::models::NewDocument;
    use crate::test_utils::TestContext;

    async fn create_document(ctx: &TestContext, filename: &str) -> i32 {
        let (document, _) = ctx
            .db()
            .create_document(&NewDocument {
                filename: filename.to_string(),
                content: String::new(),
                file_size: 0,
                page_count: 1,
            })
            .await
            .unwrap();
        document.id
    }

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_add_tags_normalizes_and_dedups() {
        let ctx = TestContext::new().await;
        let tags = ctx.state.tag_service();
        let document_id = create_document(&ctx, "a.pdf").await;

        let attached = tags
            .add_tags(document_id, &names(&["Invoice", " invoice ", "URGENT"]))
            .await
            .unwrap();
        let attached_names: Vec<&str> = attached.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(attached_names, vec!["invoice", "urgent"]);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_tags WHERE document_id = $1")
            .bind(document_id)
            .fetch_one(ctx.db().get_pool())
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_re_adding_returns_full_set() {
        let ctx = TestContext::new().await;
        let tags = ctx.state.tag_service();
        let document_id = create_document(&ctx, "b.pdf").await;

        tags.add_tags(document_id, &names(&["alpha"])).await.unwrap();
        let after = tags.add_tags(document_id, &names(&["ALPHA", "beta"])).await.unwrap();

        let after_names: Vec<&str> = after.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(after_names, vec!["alpha", "beta"]);
        assert_eq!(tags.list_tags().await.unwrap().len(), 2);
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_tags_shared_between_documents() {
        let ctx = TestContext::new().await;
        let tags = ctx.state.tag_service();
        let first = create_document(&ctx, "first.pdf").await;
        let second = create_document(&ctx, "second.pdf").await;

        let a = tags.add_tags(first, &names(&["shared"])).await.unwrap();
        let b = tags.add_tags(second, &names(&[" Shared"])).await.unwrap();
        assert_eq!(a[0].id, b[0].id);
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_add_tags_to_missing_document() {
        let ctx = TestContext::new().await;
        let err = ctx
            .state
            .tag_service()
            .add_tags(9999, &names(&["orphan"]))
            .await
            .unwrap_err();

        assert!(matches!(err, TagError::DocumentNotFound { id: 9999 }));
        assert!(ctx.state.tag_service().list_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_overlong_name_rejects_whole_batch() {
        let ctx = TestContext::new().await;
        let tags = ctx.state.tag_service();
        let document_id = create_document(&ctx, "c.pdf").await;

        let err = tags
            .add_tags(document_id, &names(&["fine", &"x".repeat(51)]))
            .await
            .unwrap_err();

        assert!(matches!(err, TagError::InvalidName { .. }));
        assert!(tags.list_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_remove_tag_semantics() {
        let ctx = TestContext::new().await;
        let tags = ctx.state.tag_service();
        let document_id = create_document(&ctx, "d.pdf").await;
        let other_id = create_document(&ctx, "e.pdf").await;

        let attached = tags.add_tags(other_id, &names(&["elsewhere"])).await.unwrap();
        let tag_id = attached[0].id;

        // Not attached to this document: success, nothing changes
        tags.remove_tag(document_id, tag_id).await.unwrap();
        assert_eq!(ctx.db().get_document_tags(other_id).await.unwrap().len(), 1);

        tags.remove_tag(other_id, tag_id).await.unwrap();
        assert!(ctx.db().get_document_tags(other_id).await.unwrap().is_empty());
        assert_eq!(tags.list_tags().await.unwrap().len(), 1);

        assert!(matches!(
            tags.remove_tag(document_id, 424242).await,
            Err(TagError::TagNotFound { id: 424242 })
        ));
        assert!(matches!(
            tags.remove_tag(424242, tag_id).await,
            Err(TagError::DocumentNotFound { id: 424242 })
        ));
    }

    #[tokio::test]
    #[ignore = "Requires Docker for PostgreSQL testcontainer"]
    async fn test_delete_missing_tag() {
        let ctx = TestContext::new().await;
        let err = ctx.state.tag_service().delete_tag(77).await.unwrap_err();
        assert!(matches!(err, TagError::TagNotFound { id: 77 }));
    }
}
