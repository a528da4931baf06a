//! Table retrieval and the shared content cache.
//!
//! [`HttpTableFetcher`] reads the remote CSV; [`ContentCache`] normalizes it
//! into an [`lexis_core::ArticleTable`] and owns the current generation.

pub mod cache;
pub mod fetcher;

pub use cache::{CacheGeneration, CacheState, CacheStatus, ContentCache};
pub use fetcher::{parse_csv, HttpTableFetcher, TableFetcher};
