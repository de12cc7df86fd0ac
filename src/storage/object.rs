use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// Write-only blob storage that hands back a public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<String, StorageError>;
}

/// Stores objects on the local filesystem and serves them under a public base URL.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// reader never sees a half-written export.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let clean = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = target.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&staging, &data).await?;
        tokio::fs::rename(&staging, &target).await?;

        tracing::info!(path, content_type, bytes = data.len(), "stored object");
        Ok(format!("{}/{}", self.public_base_url, path))
    }
}
