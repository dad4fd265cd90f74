//! Tree invariant checks and traversal.
//!
//! These run against the store at the moment they are called, so the
//! lifecycle service re-invokes them under its write lock right before
//! committing a parent change.

use std::collections::HashSet;

use tracing::warn;

use super::store::NodeStore;
use super::types::{Node, NodeId};
use crate::{Result, VaultError};

/// Confirm that `candidate` can hold children.
///
/// `None` (root level) is always valid. Otherwise the target must exist and
/// be a folder. Returns the parent record when there is one.
pub async fn validate_parent<S>(store: &S, candidate: Option<NodeId>) -> Result<Option<Node>>
where
    S: NodeStore + ?Sized,
{
    let Some(parent_id) = candidate else {
        return Ok(None);
    };

    let parent = store
        .get(parent_id)
        .await?
        .ok_or_else(|| VaultError::NotFound(format!("parent folder {parent_id}")))?;

    if !parent.is_folder() {
        return Err(VaultError::NotAFolder(parent.name));
    }

    Ok(Some(parent))
}

/// Whether re-parenting `node_id` under `candidate` would close a cycle.
///
/// Walks upward from `candidate` and reports `true` if `node_id` is the
/// candidate itself or any of its ancestors. The walk stops at the root, at
/// a dangling parent reference, or when it revisits a node.
pub async fn would_create_cycle<S>(
    store: &S,
    node_id: NodeId,
    candidate: Option<NodeId>,
) -> Result<bool>
where
    S: NodeStore + ?Sized,
{
    let mut visited = HashSet::new();
    let mut current = candidate;

    while let Some(id) = current {
        if id == node_id {
            return Ok(true);
        }
        if !visited.insert(id) {
            warn!("Parent chain above {} loops back to {}", node_id, id);
            break;
        }
        current = store.get(id).await?.and_then(|node| node.parent_id);
    }

    Ok(false)
}

/// Collect a node and all of its transitive descendants.
///
/// Uses an explicit worklist rather than recursion so deep trees cannot
/// exhaust the stack. The root comes first; the rest follow in discovery
/// order. Returns an empty list if `root` does not exist.
pub async fn collect_subtree<S>(store: &S, root: NodeId) -> Result<Vec<Node>>
where
    S: NodeStore + ?Sized,
{
    let Some(root_node) = store.get(root).await? else {
        return Ok(Vec::new());
    };

    let mut visited = HashSet::from([root]);
    let mut pending = Vec::new();
    if root_node.is_folder() {
        pending.push(root);
    }
    let mut collected = vec![root_node];

    while let Some(folder_id) = pending.pop() {
        for child in store.list_children(Some(folder_id)).await? {
            if !visited.insert(child.id) {
                continue;
            }
            if child.is_folder() {
                pending.push(child.id);
            }
            collected.push(child);
        }
    }

    Ok(collected)
}

/// Folders from the root level down to `folder_id`, inclusive.
///
/// Stops early at a dangling parent reference, so a partially orphaned
/// path still renders from the deepest reachable ancestor.
pub async fn breadcrumbs<S>(store: &S, folder_id: NodeId) -> Result<Vec<Node>>
where
    S: NodeStore + ?Sized,
{
    let mut path = Vec::new();
    let mut visited = HashSet::new();
    let mut current = Some(folder_id);

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        match store.get(id).await? {
            Some(node) => {
                current = node.parent_id;
                path.push(node);
            }
            None => break,
        }
    }

    path.reverse();
    Ok(path)
}
