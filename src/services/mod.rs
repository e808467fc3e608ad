pub mod document_query;
pub mod file_service;
pub mod tag_service;

pub use document_query::DocumentQueryService;
pub use file_service::FileService;
pub use tag_service::TagService;
