//! Derives the visible node set for a browsing context.
//!
//! All context (current folder, active tab, search box, sort menu) is passed
//! in through [`ViewQuery`]; nothing here keeps selection state.

use std::str::FromStr;

use super::types::{MediaClass, Node, NodeId};
use crate::VaultError;

/// Which part of the tree is being browsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Direct children of a folder; `None` is the root level.
    Folder(Option<NodeId>),
    /// Favorited nodes anywhere in the tree.
    Favorites,
    /// Soft-deleted nodes anywhere in the tree.
    Trash,
}

impl Default for Scope {
    fn default() -> Self {
        Scope::Folder(None)
    }
}

/// Content type filter. Folders pass every filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Image,
    Video,
    Doc,
    Other,
}

impl TypeFilter {
    fn admits(&self, node: &Node) -> bool {
        if node.is_folder() {
            return true;
        }
        match self {
            TypeFilter::All => true,
            TypeFilter::Image => node.media_class() == MediaClass::Image,
            TypeFilter::Video => node.media_class() == MediaClass::Video,
            TypeFilter::Doc => node.media_class() == MediaClass::Document,
            TypeFilter::Other => node.media_class() == MediaClass::Other,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TypeFilter::All),
            "image" => Ok(TypeFilter::Image),
            "video" => Ok(TypeFilter::Video),
            "doc" => Ok(TypeFilter::Doc),
            "other" => Ok(TypeFilter::Other),
            other => Err(VaultError::InvalidArgument(format!(
                "unknown type filter: {other}"
            ))),
        }
    }
}

/// Content sort key, applied before folders are moved to the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    SizeDesc,
    SizeAsc,
}

impl FromStr for SortOrder {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date-desc" => Ok(SortOrder::DateDesc),
            "date-asc" => Ok(SortOrder::DateAsc),
            "size-desc" => Ok(SortOrder::SizeDesc),
            "size-asc" => Ok(SortOrder::SizeAsc),
            other => Err(VaultError::InvalidArgument(format!(
                "unknown sort order: {other}"
            ))),
        }
    }
}

/// Parameters of a listing request.
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    pub scope: Scope,
    pub search: Option<String>,
    pub type_filter: TypeFilter,
    pub sort: SortOrder,
}

impl ViewQuery {
    /// Listing of a folder (`None` for root level) with default filter and sort.
    pub fn folder(folder_id: Option<NodeId>) -> Self {
        Self {
            scope: Scope::Folder(folder_id),
            ..Self::default()
        }
    }

    pub fn favorites() -> Self {
        Self {
            scope: Scope::Favorites,
            ..Self::default()
        }
    }

    pub fn trash() -> Self {
        Self {
            scope: Scope::Trash,
            ..Self::default()
        }
    }

    /// Set the free-text search term. An empty term means no search.
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = if term.is_empty() { None } else { Some(term) };
        self
    }

    pub fn with_type_filter(mut self, type_filter: TypeFilter) -> Self {
        self.type_filter = type_filter;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

fn matches_search(node: &Node, needle: &str) -> bool {
    node.name.to_lowercase().contains(needle)
        || node
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

/// Build the visible, ordered node list for `query`.
///
/// Filter precedence:
/// 1. a search term matches name or any tag, case-insensitively, across the
///    whole tree;
/// 2. the trash scope keeps only trashed nodes, every other scope drops them;
/// 3. without a search term, favorites are flattened across folders and a
///    folder scope keeps only direct children;
/// 4. the type filter applies last.
///
/// Sorting is two stable passes: first by the content key, then folders ahead
/// of files, so ties keep the content ordering within each group.
pub fn build_view(nodes: &[Node], query: &ViewQuery) -> Vec<Node> {
    let needle = query.search.as_ref().map(|term| term.to_lowercase());

    let mut visible: Vec<Node> = nodes
        .iter()
        .filter(|node| {
            if let Some(ref needle) = needle {
                if !matches_search(node, needle) {
                    return false;
                }
            }

            let in_trash_scope = query.scope == Scope::Trash;
            if node.is_trash != in_trash_scope {
                return false;
            }

            if needle.is_none() {
                match query.scope {
                    Scope::Favorites if !node.is_favorite => return false,
                    Scope::Folder(parent) if node.parent_id != parent => return false,
                    _ => {}
                }
            }

            query.type_filter.admits(node)
        })
        .cloned()
        .collect();

    match query.sort {
        SortOrder::DateDesc => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::DateAsc => visible.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::SizeDesc => visible.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes)),
        SortOrder::SizeAsc => visible.sort_by(|a, b| a.size_bytes.cmp(&b.size_bytes)),
    }
    visible.sort_by_key(|node| !node.is_folder());

    visible
}

/// The most recently created active files, newest first.
pub fn recent_files(nodes: &[Node], limit: usize) -> Vec<Node> {
    let mut files: Vec<Node> = nodes
        .iter()
        .filter(|node| !node.is_folder() && !node.is_trash)
        .cloned()
        .collect();
    files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    files.truncate(limit);
    files
}
