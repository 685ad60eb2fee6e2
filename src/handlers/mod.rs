pub mod catalog_handlers;
