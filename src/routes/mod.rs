pub mod documents;
pub mod search;
pub mod tags;
