pub mod types;
pub mod source;
pub mod cache;
pub mod listings_api;
pub mod store;
