//! SQLite-backed metadata store for cached responses.
//!
//! This module maps request URLs to the normalized headers of their last 200
//! response and the location of the stored payload, using async access via
//! tokio-rusqlite. It supports:
//!
//! - Exact-URL point lookups and insert-or-replace upserts
//! - Header normalization (lower-cased names, JSON text)
//! - Automatic schema migrations on every open
//! - Deterministic payload keys (UUIDv5 over the URL)

pub mod connection;
pub mod hash;
pub mod headers;
pub mod migrations;
pub mod records;

pub use crate::Error;

pub use connection::CacheDb;
pub use headers::NormalizedHeaders;
pub use records::ResponseRecord;
