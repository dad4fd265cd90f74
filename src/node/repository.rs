//! SQLite-backed node store.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{QueryBuilder, SqlitePool};
use tracing::debug;

use super::store::NodeStore;
use super::types::{Node, NodeId, NodeUpdate};
use crate::{Result, VaultError};

const NODE_COLUMNS: &str = "id, name, kind, content_ref, mime_type, size_bytes, parent_id, \
                            is_favorite, is_trash, tags, share_token, created_at";

/// Row type for a node from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct NodeRow {
    id: String,
    name: String,
    kind: String,
    content_ref: Option<String>,
    mime_type: String,
    size_bytes: i64,
    parent_id: Option<String>,
    is_favorite: bool,
    is_trash: bool,
    tags: String,
    share_token: Option<String>,
    created_at: String,
}

impl TryFrom<NodeRow> for Node {
    type Error = VaultError;

    fn try_from(row: NodeRow) -> Result<Self> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| VaultError::Database(format!("bad created_at for {}: {e}", row.id)))?;

        Ok(Node {
            id: row.id.parse()?,
            name: row.name,
            kind: row.kind.parse()?,
            content_ref: row.content_ref,
            mime_type: row.mime_type,
            size_bytes: u64::try_from(row.size_bytes).map_err(|_| {
                VaultError::Database(format!("negative size_bytes for {}", row.id))
            })?,
            parent_id: row.parent_id.map(|p| p.parse()).transpose()?,
            is_favorite: row.is_favorite,
            is_trash: row.is_trash,
            tags: serde_json::from_str(&row.tags)?,
            share_token: row.share_token,
            created_at,
        })
    }
}

fn rows_to_nodes(rows: Vec<NodeRow>) -> Result<Vec<Node>> {
    rows.into_iter().map(Node::try_from).collect()
}

/// Map unique-constraint violations to caller errors.
fn map_write_error(e: sqlx::Error) -> VaultError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            let message = db_err.message();
            if message.contains("share_token") {
                VaultError::InvalidArgument("share token already in use".to_string())
            } else {
                VaultError::InvalidArgument("node already exists".to_string())
            }
        }
        other => VaultError::from(other),
    }
}

/// Repository for node records in SQLite.
#[derive(Debug, Clone)]
pub struct NodeRepository {
    pool: SqlitePool,
}

impl NodeRepository {
    /// Create a new NodeRepository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NodeStore for NodeRepository {
    async fn get(&self, id: NodeId) -> Result<Option<Node>> {
        let row = sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Node::try_from).transpose()
    }

    async fn find_by_share_token(&self, token: &str) -> Result<Option<Node>> {
        let row = sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE share_token = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Node::try_from).transpose()
    }

    async fn insert(&self, node: &Node) -> Result<()> {
        debug!("Inserting node {} ({})", node.id, node.name);
        let size_bytes = i64::try_from(node.size_bytes).map_err(|_| {
            VaultError::InvalidArgument(format!("size {} is too large", node.size_bytes))
        })?;

        sqlx::query(
            "INSERT INTO nodes (id, name, kind, content_ref, mime_type, size_bytes, parent_id,
                                is_favorite, is_trash, tags, share_token, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(node.id.to_string())
        .bind(&node.name)
        .bind(node.kind.as_str())
        .bind(&node.content_ref)
        .bind(&node.mime_type)
        .bind(size_bytes)
        .bind(node.parent_id.map(|p| p.to_string()))
        .bind(node.is_favorite)
        .bind(node.is_trash)
        .bind(serde_json::to_string(&node.tags)?)
        .bind(&node.share_token)
        // Fixed-width timestamps keep `ORDER BY created_at` chronological
        .bind(node.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn update(&self, id: NodeId, update: &NodeUpdate) -> Result<Option<Node>> {
        if update.is_empty() {
            return self.get(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE nodes SET ");
        let mut separated = query.separated(", ");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }
        if let Some(parent_id) = update.parent_id {
            separated.push("parent_id = ");
            separated.push_bind_unseparated(parent_id.map(|p| p.to_string()));
        }
        if let Some(is_favorite) = update.is_favorite {
            separated.push("is_favorite = ");
            separated.push_bind_unseparated(is_favorite);
        }
        if let Some(is_trash) = update.is_trash {
            separated.push("is_trash = ");
            separated.push_bind_unseparated(is_trash);
        }
        if let Some(ref tags) = update.tags {
            separated.push("tags = ");
            separated.push_bind_unseparated(serde_json::to_string(tags)?);
        }
        if let Some(ref token) = update.share_token {
            separated.push("share_token = ");
            separated.push_bind_unseparated(token.clone());
        }

        query.push(" WHERE id = ");
        query.push_bind(id.to_string());

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id).await
    }

    async fn delete(&self, id: NodeId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<Node>> {
        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows_to_nodes(rows)
    }

    async fn list_children(&self, parent_id: Option<NodeId>) -> Result<Vec<Node>> {
        let rows = match parent_id {
            Some(parent_id) => {
                sqlx::query_as::<_, NodeRow>(&format!(
                    "SELECT {NODE_COLUMNS} FROM nodes WHERE parent_id = ? ORDER BY created_at DESC"
                ))
                .bind(parent_id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, NodeRow>(&format!(
                    "SELECT {NODE_COLUMNS} FROM nodes WHERE parent_id IS NULL ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows_to_nodes(rows)
    }
}
