//! Public share links.
//!
//! A share token is an unguessable credential bound to exactly one node.
//! Resolving it yields only what is needed to deliver that node's content,
//! never identifiers of other nodes.

use std::fmt::Write;

use rand::Rng;
use tracing::{debug, info};

use super::store::NodeStore;
use super::types::{NodeId, NodeUpdate};
use crate::{Result, VaultError};

/// Bytes of entropy in a share token.
pub const SHARE_TOKEN_BYTES: usize = 16;

/// Attempts at drawing an unused token before giving up.
const MAX_ISSUE_ATTEMPTS: usize = 8;

/// What an unauthenticated share-link holder receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedContent {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub content_ref: String,
}

/// Generate a random hex-encoded token.
pub fn generate_token() -> String {
    let bytes: [u8; SHARE_TOKEN_BYTES] = rand::rng().random();
    let mut token = String::with_capacity(SHARE_TOKEN_BYTES * 2);
    for byte in bytes {
        let _ = write!(token, "{byte:02x}");
    }
    token
}

/// Return the node's share token, issuing one if it has none.
pub async fn issue<S>(store: &S, id: NodeId) -> Result<String>
where
    S: NodeStore + ?Sized,
{
    issue_with(store, id, generate_token).await
}

/// [`issue`] with a caller-supplied token source.
pub async fn issue_with<S, G>(store: &S, id: NodeId, mut generate: G) -> Result<String>
where
    S: NodeStore + ?Sized,
    G: FnMut() -> String + Send,
{
    let node = store
        .get(id)
        .await?
        .ok_or_else(|| VaultError::NotFound(format!("node {id}")))?;

    if let Some(token) = node.share_token {
        return Ok(token);
    }

    for _ in 0..MAX_ISSUE_ATTEMPTS {
        let token = generate();
        if store.find_by_share_token(&token).await?.is_some() {
            debug!("Share token collision for {}, drawing again", id);
            continue;
        }

        store
            .update(id, &NodeUpdate::new().share_token(token.clone()))
            .await?
            .ok_or_else(|| VaultError::NotFound(format!("node {id}")))?;
        info!("Issued share link for {} ({})", id, node.name);
        return Ok(token);
    }

    Err(VaultError::StorageBackend(
        "could not draw an unused share token".to_string(),
    ))
}

/// Look up the content behind a share token.
///
/// Needs no caller identity. Folders carry no content and resolve as
/// `InvalidArgument`.
pub async fn resolve<S>(store: &S, token: &str) -> Result<SharedContent>
where
    S: NodeStore + ?Sized,
{
    let node = store
        .find_by_share_token(token)
        .await?
        .ok_or_else(|| VaultError::NotFound("share link".to_string()))?;

    let content_ref = node.content_ref.ok_or_else(|| {
        VaultError::InvalidArgument("shared node is a folder and has no content".to_string())
    })?;

    Ok(SharedContent {
        name: node.name,
        mime_type: node.mime_type,
        size_bytes: node.size_bytes,
        content_ref,
    })
}
