// Re-export all model types for ease of use

pub mod document;
pub mod responses;
pub mod tag;

pub use document::*;
pub use responses::*;
pub use tag::*;
