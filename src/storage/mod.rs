//! Blob storage for file content.
//!
//! The node layer only ever holds an opaque content reference; bytes live
//! behind the [`BlobStore`] trait.

mod file;
mod memory;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;

use crate::Result;

/// External store for file bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store content and return its reference.
    async fn put(&self, content: &[u8], content_type: &str) -> Result<String>;

    /// Load content by reference.
    ///
    /// Fails with `NotFound` if nothing is stored under `content_ref`.
    async fn get(&self, content_ref: &str) -> Result<Vec<u8>>;

    /// Release content.
    ///
    /// Returns `false` if nothing was stored under `content_ref`; callers
    /// treat that as already released.
    async fn delete(&self, content_ref: &str) -> Result<bool>;
}

/// Pick a file extension for stored content from its MIME subtype.
///
/// Falls back to `bin` for missing, long or non-alphanumeric subtypes.
pub(crate) fn extension_for(content_type: &str) -> &str {
    let subtype = content_type
        .split(';')
        .next()
        .and_then(|essence| essence.split('/').nth(1))
        .map(str::trim)
        .unwrap_or("");

    if !subtype.is_empty() && subtype.len() <= 8 && subtype.chars().all(|c| c.is_ascii_alphanumeric()) {
        subtype
    } else {
        "bin"
    }
}
