// Documents database operations organized into focused modules

mod crud;
mod helpers;
mod listing;

pub use crud::FILENAME_UNIQUE_CONSTRAINT;
pub use helpers::*;
