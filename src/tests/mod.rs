mod ingestion_tests;
mod tag_service_tests;
