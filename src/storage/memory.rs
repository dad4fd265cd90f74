//! In-memory blob store for offline mode and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{extension_for, BlobStore};
use crate::{Result, VaultError};

/// Blob store holding content in a map.
///
/// Records every reference passed to [`BlobStore::delete`], hit or miss, so
/// callers can verify release behavior.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    delete_log: Mutex<Vec<String>>,
    fail_deletes: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose deletes always fail with a backend error.
    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, content_ref: &str) -> bool {
        self.objects
            .lock()
            .map(|o| o.contains_key(content_ref))
            .unwrap_or(false)
    }

    /// References passed to `delete`, in call order.
    pub fn delete_log(&self) -> Vec<String> {
        self.delete_log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

fn poisoned() -> VaultError {
    VaultError::StorageBackend("blob store lock poisoned".to_string())
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, content: &[u8], content_type: &str) -> Result<String> {
        let content_ref = format!("{}.{}", Uuid::new_v4(), extension_for(content_type));
        self.objects
            .lock()
            .map_err(|_| poisoned())?
            .insert(content_ref.clone(), content.to_vec());
        Ok(content_ref)
    }

    async fn get(&self, content_ref: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .map_err(|_| poisoned())?
            .get(content_ref)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("blob {content_ref}")))
    }

    async fn delete(&self, content_ref: &str) -> Result<bool> {
        self.delete_log
            .lock()
            .map_err(|_| poisoned())?
            .push(content_ref.to_string());

        if self.fail_deletes {
            return Err(VaultError::StorageBackend(format!(
                "simulated failure deleting {content_ref}"
            )));
        }

        Ok(self
            .objects
            .lock()
            .map_err(|_| poisoned())?
            .remove(content_ref)
            .is_some())
    }
}
