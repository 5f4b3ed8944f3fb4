//! Command implementations for the icpfind CLI
//!
//! One module per mode. Query talks to the backend; summarize and search only
//! read the cache and never need a token.

pub mod query;
pub mod search;
pub mod summarize;

pub use query::execute as query_entities;
pub use search::execute as search_cache;
pub use summarize::execute as summarize_cache;
