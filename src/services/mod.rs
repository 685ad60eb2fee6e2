pub mod catalog;
pub mod datatier;
pub mod metadata;
pub mod object_store;
pub mod viewer;
