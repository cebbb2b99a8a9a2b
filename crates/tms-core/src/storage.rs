//! Blob storage for uploaded certificate files

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A place to put and remove named blobs
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `bytes` under the relative `path` and return its locator
    async fn put(&self, path: &str, bytes: &[u8], content_type: &str)
        -> Result<String, StorageError>;

    /// Remove the blob; `NotFound` when it does not exist
    async fn delete(&self, locator: &str) -> Result<(), StorageError>;
}

/// Files under a base directory; locators are `/<base>/<path>`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn prefix(&self) -> String {
        format!("/{}/", self.base_path.display().to_string().trim_matches('/'))
    }

    /// Resolve a relative blob path, rejecting anything that escapes the base
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.base_path.join(relative))
    }

    fn locator_to_path(&self, locator: &str) -> Result<PathBuf, StorageError> {
        let relative = locator.strip_prefix(&self.prefix()).unwrap_or(locator);
        self.resolve(relative)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, bytes).await?;

        tracing::debug!(path = %full.display(), content_type, size = bytes.len(), "Stored blob");
        Ok(format!("{}{}", self.prefix(), path.trim_start_matches('/')))
    }

    async fn delete(&self, locator: &str) -> Result<(), StorageError> {
        let full = self.locator_to_path(locator)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(locator.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
