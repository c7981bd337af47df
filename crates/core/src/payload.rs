//! Payload file storage.
//!
//! Response bodies are stored as plain files directly under the cache root,
//! one file per URL, named by [`compute_cache_key`]. There is no sharding and
//! no extension.

use std::path::{Path, PathBuf};

use crate::Error;
use crate::cache::hash::compute_cache_key;

/// Resolves payload locations and reads/writes payload bytes.
#[derive(Debug, Clone)]
pub struct PayloadStore {
    root: PathBuf,
}

impl PayloadStore {
    /// Create a store rooted at `root`.
    ///
    /// The root is made absolute against the current directory so that
    /// locations recorded in the metadata store stay valid after a `chdir`.
    /// The directory itself is created lazily on first write.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref();
        let root = std::path::absolute(root).map_err(|e| Error::from_io(root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the payload for `url`. Pure and stable per URL string.
    pub fn resolve_location(&self, url: &str) -> PathBuf {
        self.root.join(compute_cache_key(url))
    }

    /// Write `bytes` to `path`, creating the parent directory if needed.
    ///
    /// Existing content is overwritten. The write is not atomic.
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), Error> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::from_io(parent, e))?;
        }

        tokio::fs::write(path, bytes).await.map_err(|e| Error::from_io(path, e))?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "stored payload");
        Ok(())
    }

    /// Read the full payload at `path`.
    ///
    /// A missing file is `Error::PayloadMissing`.
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, Error> {
        tokio::fs::read(path).await.map_err(|e| Error::from_io(path, e))
    }

    /// Whether a payload file exists at `path`.
    pub async fn exists(&self, path: &Path) -> Result<bool, Error> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::from_io(path, e)),
        }
    }
}
