//! Client code for lastmod.
//!
//! This crate provides the conditional-GET fetch pipeline and the cache
//! manager that ties it to the metadata and payload stores.

pub mod fetch;
pub mod manager;

pub use fetch::{FetchClient, FetchConfig, FetchOutcome, FetchRequest, FetchResponse};
pub use manager::{CacheManager, Fetched};
