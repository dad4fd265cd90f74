//! Node lifecycle service.
//!
//! This module provides the high-level operations on nodes:
//! - File and folder creation with parent and quota checks
//! - Rename, move, favorite and tag updates
//! - Two-stage delete (trash, then recursive permanent delete)
//! - Upload and download through the blob store
//! - Views, recent files, breadcrumbs and storage usage
//!
//! Every mutation runs under one service-wide write lock and validates
//! against the store as it is at that moment, so two concurrent moves can
//! never commit a cycle between them. Reads take no lock.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::share::{self, SharedContent};
use super::store::NodeStore;
use super::tree;
use super::types::{NewNode, Node, NodeId, NodeUpdate};
use super::view::{self, ViewQuery};
use super::{DEFAULT_QUOTA_BYTES, MAX_FILE_SIZE, MAX_NAME_LENGTH};
use crate::config::StorageConfig;
use crate::storage::BlobStore;
use crate::{Result, VaultError};

/// Request data for a file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Display name of the new file.
    pub name: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// Folder to upload into, or `None` for the root level.
    pub parent_id: Option<NodeId>,
    /// File content.
    pub content: Vec<u8>,
}

impl UploadRequest {
    /// Create a new upload request for the root level.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            parent_id: None,
            content,
        }
    }

    /// Set the target folder.
    pub fn with_parent(mut self, parent_id: Option<NodeId>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

/// Where a file's bytes live, for an authenticated download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLocator {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub content_ref: String,
}

/// Storage consumption against the quota.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageUsage {
    /// Sum of sizes over active files.
    pub used_bytes: u64,
    pub quota_bytes: u64,
    /// Percentage of the quota in use, capped at 100.
    pub percent: f64,
}

/// Summary of a permanent delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Every node removed from the store, subtree root first.
    pub removed: Vec<NodeId>,
    /// Blob objects that were released.
    pub blobs_released: usize,
    /// Blob objects that were already gone.
    pub blobs_missing: usize,
    /// Blob objects whose release failed and were left behind.
    pub blobs_failed: usize,
}

/// Effect of the delete action, which depends on the node's trash state.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// An active node moved to the trash.
    Trashed(Node),
    /// A trashed node and its subtree were permanently removed.
    Removed(PurgeReport),
}

/// Lifecycle manager over a node store and a blob store.
pub struct NodeService<S, B> {
    store: S,
    blobs: B,
    quota_bytes: u64,
    max_name_length: usize,
    write_lock: Mutex<()>,
}

impl<S, B> NodeService<S, B>
where
    S: NodeStore,
    B: BlobStore,
{
    /// Create a new NodeService with the default quota and name limit.
    pub fn new(store: S, blobs: B) -> Self {
        Self {
            store,
            blobs,
            quota_bytes: DEFAULT_QUOTA_BYTES,
            max_name_length: MAX_NAME_LENGTH,
            write_lock: Mutex::new(()),
        }
    }

    /// Create a new NodeService using limits from the storage configuration.
    pub fn with_config(store: S, blobs: B, config: &StorageConfig) -> Self {
        Self::new(store, blobs)
            .with_quota(config.quota_bytes)
            .with_max_name_length(config.max_name_length)
    }

    /// Set the storage ceiling in bytes.
    pub fn with_quota(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Set the maximum name length in characters.
    pub fn with_max_name_length(mut self, max_name_length: usize) -> Self {
        self.max_name_length = max_name_length;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    // ---------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------

    /// Create a file record for content already in the blob store.
    ///
    /// # Validation
    /// - Name: non-blank, at most `max_name_length` characters
    /// - Size: at most [`MAX_FILE_SIZE`]
    /// - Parent: root, or an existing folder
    /// - Quota: active usage plus `size_bytes` must not exceed the ceiling
    pub async fn create_file(
        &self,
        name: &str,
        mime_type: &str,
        size_bytes: u64,
        parent_id: Option<NodeId>,
        content_ref: &str,
    ) -> Result<Node> {
        let _guard = self.write_lock.lock().await;

        self.check_new_file(name, size_bytes, parent_id).await?;
        let node = Node::from_new(
            NewNode::file(name, mime_type, size_bytes, content_ref).with_parent(parent_id),
        );
        self.store.insert(&node).await?;

        info!("Created file {} ({}, {} bytes)", node.id, node.name, size_bytes);
        Ok(node)
    }

    /// Create a folder.
    pub async fn create_folder(&self, name: &str, parent_id: Option<NodeId>) -> Result<Node> {
        let _guard = self.write_lock.lock().await;

        self.validate_name(name)?;
        tree::validate_parent(&self.store, parent_id).await?;
        let node = Node::from_new(NewNode::folder(name).with_parent(parent_id));
        self.store.insert(&node).await?;

        info!("Created folder {} ({})", node.id, node.name);
        Ok(node)
    }

    /// Store content in the blob store and create its file record.
    ///
    /// Checks run before the bytes are written. If the record cannot be
    /// created afterwards, the blob is released again.
    pub async fn upload(&self, request: UploadRequest) -> Result<Node> {
        let _guard = self.write_lock.lock().await;

        let size_bytes = request.content.len() as u64;
        self.check_new_file(&request.name, size_bytes, request.parent_id)
            .await?;

        let content_ref = self
            .blobs
            .put(&request.content, &request.mime_type)
            .await?;

        let node = Node::from_new(
            NewNode::file(request.name, request.mime_type, size_bytes, content_ref.clone())
                .with_parent(request.parent_id),
        );
        if let Err(e) = self.store.insert(&node).await {
            if let Err(release_err) = self.blobs.delete(&content_ref).await {
                warn!(
                    "Failed to release blob {} after aborted upload: {}",
                    content_ref, release_err
                );
            }
            return Err(e);
        }

        info!("Uploaded {} ({}, {} bytes)", node.id, node.name, size_bytes);
        Ok(node)
    }

    // ---------------------------------------------------------------------
    // Attribute changes
    // ---------------------------------------------------------------------

    /// Rename a node. Renaming to the current name is a no-op.
    pub async fn rename(&self, id: NodeId, new_name: &str) -> Result<Node> {
        let _guard = self.write_lock.lock().await;

        let node = self.require(id).await?;
        if node.name == new_name {
            return Ok(node);
        }
        self.validate_name(new_name)?;

        let renamed = self.commit(id, NodeUpdate::new().name(new_name)).await?;
        info!("Renamed {} from {} to {}", id, node.name, renamed.name);
        Ok(renamed)
    }

    /// Move a node under a new parent (`None` for the root level).
    ///
    /// # Errors
    /// - `SelfMove` if `new_parent` is the node itself
    /// - `NotFound` if the node or the target folder does not exist
    /// - `NotAFolder` if the target is a file
    /// - `CycleDetected` if the target is a descendant of the node
    pub async fn move_node(&self, id: NodeId, new_parent: Option<NodeId>) -> Result<Node> {
        if new_parent == Some(id) {
            return Err(VaultError::SelfMove);
        }

        let _guard = self.write_lock.lock().await;

        let node = self.require(id).await?;
        tree::validate_parent(&self.store, new_parent).await?;
        if tree::would_create_cycle(&self.store, id, new_parent).await? {
            return Err(VaultError::CycleDetected);
        }
        if node.parent_id == new_parent {
            return Ok(node);
        }

        let moved = self.commit(id, NodeUpdate::new().parent_id(new_parent)).await?;
        info!("Moved {} ({}) to {:?}", id, moved.name, new_parent);
        Ok(moved)
    }

    /// Flip the favorite flag.
    pub async fn toggle_favorite(&self, id: NodeId) -> Result<Node> {
        let _guard = self.write_lock.lock().await;

        let node = self.require(id).await?;
        let updated = self
            .commit(id, NodeUpdate::new().favorite(!node.is_favorite))
            .await?;
        debug!("Favorite for {} is now {}", id, updated.is_favorite);
        Ok(updated)
    }

    /// Replace the tag set.
    ///
    /// Tags are trimmed, blank entries dropped and duplicates collapsed,
    /// keeping the first occurrence's position.
    pub async fn update_tags(&self, id: NodeId, tags: Vec<String>) -> Result<Node> {
        let _guard = self.write_lock.lock().await;

        self.require(id).await?;
        let updated = self
            .commit(id, NodeUpdate::new().tags(normalize_tags(tags)))
            .await?;
        debug!("Tags for {} set to {:?}", id, updated.tags);
        Ok(updated)
    }

    // ---------------------------------------------------------------------
    // Delete and restore
    // ---------------------------------------------------------------------

    /// The delete action: trash an active node, or permanently remove an
    /// already trashed one together with its subtree.
    pub async fn trash(&self, id: NodeId) -> Result<DeleteOutcome> {
        let _guard = self.write_lock.lock().await;

        let node = self.require(id).await?;
        if node.is_trash {
            return self.purge(node).await.map(DeleteOutcome::Removed);
        }

        let trashed = self.commit(id, NodeUpdate::new().trash(true)).await?;
        info!("Moved {} ({}) to trash", id, trashed.name);
        Ok(DeleteOutcome::Trashed(trashed))
    }

    /// Apply the delete action to each node in turn.
    ///
    /// A failure on one node does not stop the rest; every id gets its own
    /// outcome.
    pub async fn trash_many(&self, ids: &[NodeId]) -> Vec<(NodeId, Result<DeleteOutcome>)> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for &id in ids {
            let outcome = self.trash(id).await;
            if let Err(ref e) = outcome {
                warn!("Bulk delete skipped {}: {}", id, e);
            }
            outcomes.push((id, outcome));
        }
        outcomes
    }

    /// Take a node out of the trash. The parent's trash state is irrelevant.
    ///
    /// A restored file counts against the quota again, so restoring fails
    /// with `QuotaExceeded` if it no longer fits.
    pub async fn restore(&self, id: NodeId) -> Result<Node> {
        let _guard = self.write_lock.lock().await;

        let node = self.require(id).await?;
        if !node.is_trash {
            return Ok(node);
        }
        if !node.is_folder() {
            self.check_quota(node.size_bytes).await?;
        }

        let restored = self.commit(id, NodeUpdate::new().trash(false)).await?;
        info!("Restored {} ({}) from trash", id, restored.name);
        Ok(restored)
    }

    /// Permanently remove a trashed node and everything beneath it.
    ///
    /// Fails with `InvalidArgument` if the node is still active.
    pub async fn permanent_delete(&self, id: NodeId) -> Result<PurgeReport> {
        let _guard = self.write_lock.lock().await;

        let node = self.require(id).await?;
        if !node.is_trash {
            return Err(VaultError::InvalidArgument(format!(
                "{} must be in the trash before it can be deleted permanently",
                node.name
            )));
        }
        self.purge(node).await
    }

    /// Remove `root` and its descendants. Caller holds the write lock.
    ///
    /// Blob release failures are logged and do not stop metadata removal.
    async fn purge(&self, root: Node) -> Result<PurgeReport> {
        let subtree = tree::collect_subtree(&self.store, root.id).await?;
        let mut report = PurgeReport::default();

        for node in &subtree {
            let Some(ref content_ref) = node.content_ref else {
                continue;
            };
            match self.blobs.delete(content_ref).await {
                Ok(true) => report.blobs_released += 1,
                Ok(false) => {
                    warn!("Blob {} for {} was already gone", content_ref, node.id);
                    report.blobs_missing += 1;
                }
                Err(e) => {
                    warn!("Failed to release blob {} for {}: {}", content_ref, node.id, e);
                    report.blobs_failed += 1;
                }
            }
        }

        for node in subtree {
            if self.store.delete(node.id).await? {
                report.removed.push(node.id);
            }
        }

        info!(
            "Permanently deleted {} ({}): {} nodes, {} blobs released",
            root.id,
            root.name,
            report.removed.len(),
            report.blobs_released
        );
        Ok(report)
    }

    // ---------------------------------------------------------------------
    // Sharing
    // ---------------------------------------------------------------------

    /// Issue a public share link, or return the existing one.
    pub async fn share(&self, id: NodeId) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        share::issue(&self.store, id).await
    }

    /// Resolve a share token. Needs no caller identity.
    pub async fn resolve_share(&self, token: &str) -> Result<SharedContent> {
        share::resolve(&self.store, token).await
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Get a node by ID.
    pub async fn get(&self, id: NodeId) -> Result<Node> {
        self.require(id).await
    }

    /// Every node, newest first.
    pub async fn list_all(&self) -> Result<Vec<Node>> {
        self.store.list_all().await
    }

    /// The visible, ordered node list for a query.
    pub async fn view(&self, query: &ViewQuery) -> Result<Vec<Node>> {
        let nodes = self.store.list_all().await?;
        Ok(view::build_view(&nodes, query))
    }

    /// The most recently created active files.
    pub async fn recent_files(&self, limit: usize) -> Result<Vec<Node>> {
        let nodes = self.store.list_all().await?;
        Ok(view::recent_files(&nodes, limit))
    }

    /// Folder path from the root level down to `folder_id`.
    pub async fn breadcrumbs(&self, folder_id: NodeId) -> Result<Vec<Node>> {
        self.require(folder_id).await?;
        tree::breadcrumbs(&self.store, folder_id).await
    }

    /// Sum of sizes over active files.
    pub async fn used_bytes(&self) -> Result<u64> {
        let active_files = self
            .store
            .scan(&|node: &Node| !node.is_folder() && !node.is_trash)
            .await?;
        Ok(active_files.iter().map(|node| node.size_bytes).sum())
    }

    /// Storage consumption against the quota.
    pub async fn storage_usage(&self) -> Result<StorageUsage> {
        let used_bytes = self.used_bytes().await?;
        let percent = if self.quota_bytes == 0 {
            100.0
        } else {
            (used_bytes as f64 / self.quota_bytes as f64 * 100.0).min(100.0)
        };
        Ok(StorageUsage {
            used_bytes,
            quota_bytes: self.quota_bytes,
            percent,
        })
    }

    /// Locate a file's content for download. Folders have none.
    pub async fn open(&self, id: NodeId) -> Result<ContentLocator> {
        let node = self.require(id).await?;
        let content_ref = node.content_ref.ok_or_else(|| {
            VaultError::InvalidArgument(format!("{} is a folder and has no content", node.name))
        })?;

        Ok(ContentLocator {
            name: node.name,
            mime_type: node.mime_type,
            size_bytes: node.size_bytes,
            content_ref,
        })
    }

    /// Read a file's bytes from the blob store.
    pub async fn read_content(&self, id: NodeId) -> Result<Vec<u8>> {
        let locator = self.open(id).await?;
        self.blobs.get(&locator.content_ref).await
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    async fn require(&self, id: NodeId) -> Result<Node> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("node {id}")))
    }

    async fn commit(&self, id: NodeId, update: NodeUpdate) -> Result<Node> {
        self.store
            .update(id, &update)
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("node {id}")))
    }

    fn validate_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(VaultError::InvalidArgument("name must not be empty".to_string()));
        }
        if name.chars().count() > self.max_name_length {
            return Err(VaultError::InvalidArgument(format!(
                "name must be at most {} characters",
                self.max_name_length
            )));
        }
        Ok(())
    }

    async fn check_new_file(
        &self,
        name: &str,
        size_bytes: u64,
        parent_id: Option<NodeId>,
    ) -> Result<()> {
        self.validate_name(name)?;
        if size_bytes > MAX_FILE_SIZE {
            return Err(VaultError::InvalidArgument(format!(
                "file size must be at most {MAX_FILE_SIZE} bytes"
            )));
        }
        tree::validate_parent(&self.store, parent_id).await?;
        self.check_quota(size_bytes).await
    }

    /// Fail if making `size_bytes` more content active would pass the ceiling.
    async fn check_quota(&self, size_bytes: u64) -> Result<()> {
        let used = self.used_bytes().await?;
        if used.saturating_add(size_bytes) > self.quota_bytes {
            return Err(VaultError::QuotaExceeded {
                used,
                requested: size_bytes,
                quota: self.quota_bytes,
            });
        }
        Ok(())
    }
}

/// Trim tags, drop blank ones and collapse duplicates.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}
