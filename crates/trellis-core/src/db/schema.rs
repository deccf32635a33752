//! SQLite schema for the trellis graph database.
//!
//! - `nodes` holds one row per task or date node; `node_completed` is the
//!   only persisted completion state
//! - `links` is the flat parent -> child edge list; deleting a node cascades
//!   to its edges
//!
//! `AUTOINCREMENT` keeps row ids from ever being reused.

/// Migration v1: nodes, links and the lookup indexes.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS nodes (
    node_id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_name TEXT NOT NULL CHECK (length(node_name) BETWEEN 1 AND 100),
    node_alias TEXT UNIQUE CHECK (node_alias IS NULL OR length(node_alias) BETWEEN 1 AND 100),
    node_created INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER)),
    node_completed INTEGER
);

CREATE TABLE IF NOT EXISTS links (
    link_id INTEGER PRIMARY KEY AUTOINCREMENT,
    origin_id INTEGER NOT NULL REFERENCES nodes(node_id) ON DELETE CASCADE,
    dest_id INTEGER NOT NULL REFERENCES nodes(node_id) ON DELETE CASCADE,
    UNIQUE (origin_id, dest_id),
    CHECK (origin_id <> dest_id)
);

CREATE INDEX IF NOT EXISTS idx_links_origin ON links(origin_id);
CREATE INDEX IF NOT EXISTS idx_links_dest ON links(dest_id);
CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(node_name);
";

/// Indexes that must exist once all migrations have run.
pub const REQUIRED_INDEXES: &[&str] = &["idx_links_origin", "idx_links_dest", "idx_nodes_name"];
