//! Response header normalization.
//!
//! Header names are lower-cased before they are stored so that lookups such as
//! `last-modified` hit regardless of the casing the origin server used. When a
//! header repeats, the last value wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Header name used for revalidation.
pub const LAST_MODIFIED: &str = "last-modified";

/// Response headers keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedHeaders(BTreeMap<String, String>);

impl NormalizedHeaders {
    /// Normalize an iterator of `(name, value)` pairs.
    pub fn normalize<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self(
            headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
        )
    }

    /// Look up a header; `name` is lower-cased before probing.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The stored `Last-Modified` value, passed through verbatim.
    pub fn last_modified(&self) -> Option<&str> {
        self.get(LAST_MODIFIED)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize to the JSON text stored in the `headers` column.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Parse the JSON text stored in the `headers` column.
    ///
    /// Keys are normalized again on the way in, so rows written by other tools
    /// with mixed-case names still resolve.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        Ok(Self::normalize(raw))
    }
}
