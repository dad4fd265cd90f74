//! Database schema and migrations for cloudvault.
//!
//! Migrations are applied sequentially when the database is first opened or
//! upgraded; the schema_version table tracks which have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: nodes table holding both files and folders
    r#"
CREATE TABLE nodes (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    kind        TEXT NOT NULL,               -- 'file' or 'folder'
    content_ref TEXT,                        -- blob store key, NULL for folders
    mime_type   TEXT NOT NULL,
    size_bytes  INTEGER NOT NULL DEFAULT 0,
    parent_id   TEXT,                        -- NULL for root level; no FK so dangling parents can be healed
    is_favorite INTEGER NOT NULL DEFAULT 0,
    is_trash    INTEGER NOT NULL DEFAULT 0,
    tags        TEXT NOT NULL DEFAULT '[]',  -- JSON array
    share_token TEXT UNIQUE,
    created_at  TEXT NOT NULL                -- RFC 3339
);

CREATE INDEX idx_nodes_parent_id ON nodes(parent_id);
CREATE INDEX idx_nodes_is_trash ON nodes(is_trash);
"#,
];
