//! Directory-backed blob store.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{extension_for, BlobStore};
use crate::{Result, VaultError};

/// Blob store keeping each object as a file in a sharded directory tree.
///
/// Objects are named by UUID and sharded by the first two characters:
/// ```text
/// {base_path}/
/// ├── ab/
/// │   └── ab12cd34-5678-90ab-cdef-123456789012.png
/// ├── cd/
/// │   └── cd90ab12-3456-7890-abcd-ef1234567890.bin
/// └── ...
/// ```
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    base_path: PathBuf,
}

impl FileBlobStore {
    /// Create a new FileBlobStore, creating the base directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Get the base path of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Full path for a content reference.
    ///
    /// Rejects references that could escape the base directory.
    pub fn object_path(&self, content_ref: &str) -> Result<PathBuf> {
        if content_ref.is_empty()
            || content_ref.contains(['/', '\\'])
            || content_ref.starts_with('.')
        {
            return Err(VaultError::InvalidArgument(format!(
                "malformed content reference: {content_ref}"
            )));
        }
        Ok(self.base_path.join(Self::shard(content_ref)).join(content_ref))
    }

    /// Shard directory name: the first two characters of the reference.
    fn shard(content_ref: &str) -> &str {
        content_ref.get(..2).unwrap_or(content_ref)
    }

    /// Remove empty shard directories, returning how many were removed.
    pub async fn cleanup_empty_dirs(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let mut dir = tokio::fs::read_dir(&path).await?;
            if dir.next_entry().await?.is_none() && tokio::fs::remove_dir(&path).await.is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn put(&self, content: &[u8], content_type: &str) -> Result<String> {
        let content_ref = format!("{}.{}", Uuid::new_v4(), extension_for(content_type));
        let path = self.object_path(&content_ref)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        debug!("Stored {} bytes as {}", content.len(), content_ref);
        Ok(content_ref)
    }

    async fn get(&self, content_ref: &str) -> Result<Vec<u8>> {
        let path = self.object_path(content_ref)?;

        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(VaultError::NotFound(format!("blob {content_ref}")))
            }
            Err(e) => Err(VaultError::StorageBackend(e.to_string())),
        }
    }

    async fn delete(&self, content_ref: &str) -> Result<bool> {
        let path = self.object_path(content_ref)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VaultError::StorageBackend(e.to_string())),
        }
    }
}
