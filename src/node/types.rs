//! Node record types shared by every store backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FOLDER_MIME_TYPE;
use crate::{Result, VaultError};

/// Opaque, immutable node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for NodeId {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| VaultError::InvalidArgument(format!("malformed node id: {s}")))
    }
}

/// Whether a node is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

impl NodeKind {
    /// Convert to the stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Folder => "folder",
        }
    }
}

impl FromStr for NodeKind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(NodeKind::File),
            "folder" => Ok(NodeKind::Folder),
            other => Err(VaultError::InvalidArgument(format!(
                "unknown node kind: {other}"
            ))),
        }
    }
}

/// Coarse content classification used by the type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Image,
    Video,
    Document,
    Other,
}

impl MediaClass {
    /// Classify a MIME type.
    ///
    /// `image/` and `video/` are prefix matches; documents are any type
    /// mentioning `pdf`, `document` or `text`.
    pub fn of(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            MediaClass::Image
        } else if mime_type.starts_with("video/") {
            MediaClass::Video
        } else if ["pdf", "document", "text"]
            .iter()
            .any(|needle| mime_type.contains(needle))
        {
            MediaClass::Document
        } else {
            MediaClass::Other
        }
    }
}

/// A file or folder metadata record.
///
/// Serializes through [`NodeRecord`], which carries `isFolder` in place of
/// the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "NodeRecord", from = "NodeRecord")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Blob store reference; `None` for folders.
    pub content_ref: Option<String>,
    pub mime_type: String,
    pub size_bytes: u64,
    pub parent_id: Option<NodeId>,
    pub is_favorite: bool,
    pub is_trash: bool,
    pub tags: Vec<String>,
    pub share_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Materialize a new record from creation data.
    pub fn from_new(new: NewNode) -> Self {
        Self {
            id: NodeId::new(),
            name: new.name,
            kind: new.kind,
            content_ref: new.content_ref,
            mime_type: new.mime_type,
            size_bytes: new.size_bytes,
            parent_id: new.parent_id,
            is_favorite: false,
            is_trash: false,
            tags: Vec::new(),
            share_token: None,
            created_at: Utc::now(),
        }
    }

    /// Derived from `kind`.
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn media_class(&self) -> MediaClass {
        MediaClass::of(&self.mime_type)
    }

    /// Apply an update in place.
    pub fn apply(&mut self, update: &NodeUpdate) {
        if let Some(ref name) = update.name {
            self.name = name.clone();
        }
        if let Some(parent_id) = update.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(is_favorite) = update.is_favorite {
            self.is_favorite = is_favorite;
        }
        if let Some(is_trash) = update.is_trash {
            self.is_trash = is_trash;
        }
        if let Some(ref tags) = update.tags {
            self.tags = tags.clone();
        }
        if let Some(ref token) = update.share_token {
            self.share_token = Some(token.clone());
        }
    }
}

/// Wire shape of a [`Node`], using the camelCase names of the API surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub is_folder: bool,
    pub is_favorite: bool,
    pub is_trash: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub share_token: Option<String>,
    #[serde(default)]
    pub content_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Node> for NodeRecord {
    fn from(node: Node) -> Self {
        Self {
            is_folder: node.is_folder(),
            id: node.id,
            name: node.name,
            mime_type: node.mime_type,
            size_bytes: node.size_bytes,
            is_favorite: node.is_favorite,
            is_trash: node.is_trash,
            tags: node.tags,
            parent_id: node.parent_id,
            share_token: node.share_token,
            content_ref: node.content_ref,
            created_at: node.created_at,
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            kind: if record.is_folder {
                NodeKind::Folder
            } else {
                NodeKind::File
            },
            content_ref: record.content_ref,
            mime_type: record.mime_type,
            size_bytes: record.size_bytes,
            parent_id: record.parent_id,
            is_favorite: record.is_favorite,
            is_trash: record.is_trash,
            tags: record.tags,
            share_token: record.share_token,
            created_at: record.created_at,
        }
    }
}

/// Data for creating a new node.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub name: String,
    pub kind: NodeKind,
    pub content_ref: Option<String>,
    pub mime_type: String,
    pub size_bytes: u64,
    pub parent_id: Option<NodeId>,
}

impl NewNode {
    /// Creation data for a file.
    pub fn file(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
        content_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
            content_ref: Some(content_ref.into()),
            mime_type: mime_type.into(),
            size_bytes,
            parent_id: None,
        }
    }

    /// Creation data for a folder.
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Folder,
            content_ref: None,
            mime_type: FOLDER_MIME_TYPE.to_string(),
            size_bytes: 0,
            parent_id: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: Option<NodeId>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

/// Builder for updating a node.
///
/// Identity, kind, content and creation time are immutable, so only the
/// user-mutable fields appear here. A share token can be set but never
/// cleared.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub parent_id: Option<Option<NodeId>>,
    pub is_favorite: Option<bool>,
    pub is_trash: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub share_token: Option<String>,
}

impl NodeUpdate {
    /// Create a new NodeUpdate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the parent folder (`None` moves to root level).
    pub fn parent_id(mut self, parent_id: Option<NodeId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the favorite flag.
    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = Some(is_favorite);
        self
    }

    /// Set the trash flag.
    pub fn trash(mut self, is_trash: bool) -> Self {
        self.is_trash = Some(is_trash);
        self
    }

    /// Replace the tag list.
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Set the share token.
    pub fn share_token(mut self, token: impl Into<String>) -> Self {
        self.share_token = Some(token.into());
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.parent_id.is_none()
            && self.is_favorite.is_none()
            && self.is_trash.is_none()
            && self.tags.is_none()
            && self.share_token.is_none()
    }
}
