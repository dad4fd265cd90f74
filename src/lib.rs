//! cloudvault - personal cloud file vault
//!
//! Hierarchical file and folder metadata with trash, favorites, tags and
//! public share links. File bytes live in a pluggable blob store; node
//! records live in SQLite or in memory.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod node;
pub mod storage;

pub use config::Config;
pub use db::Database;
pub use error::{ErrorKind, Result, VaultError};
pub use node::{
    ContentLocator, DeleteOutcome, MediaClass, MemoryNodeStore, NewNode, Node, NodeId, NodeKind,
    NodeRecord, NodeRepository, NodeService, NodeStore, NodeUpdate, PurgeReport, Scope,
    SharedContent, SortOrder, StorageUsage, TypeFilter, UploadRequest, ViewQuery,
};
pub use storage::{BlobStore, FileBlobStore, MemoryBlobStore};
