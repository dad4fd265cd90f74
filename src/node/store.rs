//! Entity store abstraction and the in-memory (offline) backend.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{Node, NodeId, NodeUpdate};
use crate::{Result, VaultError};

/// Predicate used by [`NodeStore::scan`].
pub type NodePredicate<'a> = &'a (dyn Fn(&Node) -> bool + Send + Sync);

/// Durable keyed storage for node records.
///
/// Every method is atomic for the record it touches. Implementations:
/// [`MemoryNodeStore`] for offline mode and tests, and
/// [`NodeRepository`](super::NodeRepository) over SQLite.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Get a node by ID.
    async fn get(&self, id: NodeId) -> Result<Option<Node>>;

    /// Get the node holding the given share token.
    async fn find_by_share_token(&self, token: &str) -> Result<Option<Node>>;

    /// Insert a new node.
    ///
    /// Fails with `InvalidArgument` if the ID or share token is already taken.
    async fn insert(&self, node: &Node) -> Result<()>;

    /// Update a node, returning the new record or `None` if it does not exist.
    async fn update(&self, id: NodeId, update: &NodeUpdate) -> Result<Option<Node>>;

    /// Delete a node by ID. Returns whether a record was removed.
    async fn delete(&self, id: NodeId) -> Result<bool>;

    /// All nodes, newest first.
    async fn list_all(&self) -> Result<Vec<Node>>;

    /// Direct children of a folder, or root-level nodes for `None`.
    async fn list_children(&self, parent_id: Option<NodeId>) -> Result<Vec<Node>> {
        self.scan(&|node: &Node| node.parent_id == parent_id).await
    }

    /// All nodes matching a predicate, newest first.
    async fn scan(&self, predicate: NodePredicate<'_>) -> Result<Vec<Node>> {
        let nodes = self.list_all().await?;
        Ok(nodes.into_iter().filter(|node| predicate(node)).collect())
    }
}

/// In-memory node store.
///
/// Optionally mirrored to a JSON snapshot file that is rewritten after each
/// mutation, so an offline session survives restarts. A mutation only takes
/// effect in memory once its snapshot has been written.
#[derive(Debug, Default)]
pub struct MemoryNodeStore {
    nodes: RwLock<Vec<Node>>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryNodeStore {
    /// Create an empty, non-persistent store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by a JSON snapshot file.
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first mutation.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let nodes = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<Node>>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Loaded {} nodes from snapshot {:?}", nodes.len(), path);

        Ok(Self {
            nodes: RwLock::new(nodes),
            snapshot_path: Some(path),
        })
    }

    async fn persist(&self, nodes: &[Node]) -> Result<()> {
        let Some(ref path) = self.snapshot_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(nodes)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

fn newest_first(mut nodes: Vec<Node>) -> Vec<Node> {
    nodes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    nodes
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn get(&self, id: NodeId) -> Result<Option<Node>> {
        let nodes = self.nodes.read().await;
        Ok(nodes.iter().find(|n| n.id == id).cloned())
    }

    async fn find_by_share_token(&self, token: &str) -> Result<Option<Node>> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .iter()
            .find(|n| n.share_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert(&self, node: &Node) -> Result<()> {
        let mut nodes = self.nodes.write().await;

        if nodes.iter().any(|n| n.id == node.id) {
            return Err(VaultError::InvalidArgument(format!(
                "node {} already exists",
                node.id
            )));
        }
        if let Some(ref token) = node.share_token {
            if nodes.iter().any(|n| n.share_token.as_ref() == Some(token)) {
                return Err(VaultError::InvalidArgument(
                    "share token already in use".to_string(),
                ));
            }
        }

        let mut staged = nodes.clone();
        staged.push(node.clone());
        self.persist(&staged).await?;
        *nodes = staged;
        Ok(())
    }

    async fn update(&self, id: NodeId, update: &NodeUpdate) -> Result<Option<Node>> {
        let mut nodes = self.nodes.write().await;

        if let Some(ref token) = update.share_token {
            if nodes
                .iter()
                .any(|n| n.id != id && n.share_token.as_ref() == Some(token))
            {
                return Err(VaultError::InvalidArgument(
                    "share token already in use".to_string(),
                ));
            }
        }

        let Some(index) = nodes.iter().position(|n| n.id == id) else {
            return Ok(None);
        };
        if update.is_empty() {
            return Ok(Some(nodes[index].clone()));
        }

        let mut staged = nodes.clone();
        staged[index].apply(update);
        let updated = staged[index].clone();
        self.persist(&staged).await?;
        *nodes = staged;
        Ok(Some(updated))
    }

    async fn delete(&self, id: NodeId) -> Result<bool> {
        let mut nodes = self.nodes.write().await;
        if !nodes.iter().any(|n| n.id == id) {
            return Ok(false);
        }

        let staged: Vec<Node> = nodes.iter().filter(|n| n.id != id).cloned().collect();
        self.persist(&staged).await?;
        *nodes = staged;
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<Node>> {
        Ok(newest_first(self.nodes.read().await.clone()))
    }

    async fn scan(&self, predicate: NodePredicate<'_>) -> Result<Vec<Node>> {
        let nodes = self.nodes.read().await;
        Ok(newest_first(
            nodes.iter().filter(|n| predicate(n)).cloned().collect(),
        ))
    }
}
