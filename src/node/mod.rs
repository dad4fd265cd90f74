//! File and folder metadata for cloudvault.
//!
//! This module provides:
//! - The node record shared by files and folders
//! - Pluggable node storage (in-memory and SQLite)
//! - Tree invariant checks (parent validity, acyclicity)
//! - Lifecycle operations (create, rename, move, trash, restore, delete)
//! - View building (scopes, search, type filters, sorting)
//! - Public share links

mod repository;
mod service;
pub mod share;
mod store;
pub mod tree;
mod types;
pub mod view;

pub use repository::NodeRepository;
pub use service::{
    ContentLocator, DeleteOutcome, NodeService, PurgeReport, StorageUsage, UploadRequest,
};
pub use share::SharedContent;
pub use store::{MemoryNodeStore, NodePredicate, NodeStore};
pub use types::{MediaClass, NewNode, Node, NodeId, NodeKind, NodeRecord, NodeUpdate};
pub use view::{Scope, SortOrder, TypeFilter, ViewQuery};

/// MIME type recorded for folders.
pub const FOLDER_MIME_TYPE: &str = "folder";

/// Default account-wide storage ceiling (1 GiB).
pub const DEFAULT_QUOTA_BYTES: u64 = 1024 * 1024 * 1024;

/// Largest file size the node store can record.
pub const MAX_FILE_SIZE: u64 = i64::MAX as u64;

/// Maximum length for a node name (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Number of entries in the recent files list.
pub const RECENT_FILES_LIMIT: usize = 5;
