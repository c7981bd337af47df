//! Core types and shared functionality for lastmod.
//!
//! This crate provides:
//! - Metadata store with SQLite backend
//! - Payload file storage addressed by URL hash
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod payload;

pub use cache::{CacheDb, NormalizedHeaders, ResponseRecord};
pub use config::{AppConfig, ConfigError, ConfigOverrides};
pub use error::Error;
pub use payload::PayloadStore;
