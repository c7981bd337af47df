//! Deterministic cache keys for payload files.

use uuid::Uuid;

/// Compute the payload key for a URL.
///
/// A version-5 UUID over the URL namespace, keyed on the exact URL string,
/// so the same string maps to the same key across runs.
pub fn compute_cache_key(url: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).to_string()
}
