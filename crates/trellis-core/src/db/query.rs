//! Typed read and write helpers over the `nodes` and `links` tables.
//!
//! All helpers take a plain `&Connection`, so they run equally inside a
//! `rusqlite::Transaction` (which derefs to a connection).

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::model::{Link, NodeId, NodeRecord};

const NODE_COLUMNS: &str = "n.node_id, n.node_name, n.node_alias, n.node_created, n.node_completed";

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<NodeRecord> {
    Ok(NodeRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        alias: row.get(2)?,
        created_at: row.get(3)?,
        completed_at: row.get(4)?,
    })
}

fn row_to_link(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: row.get(0)?,
        origin: row.get(1)?,
        dest: row.get(2)?,
    })
}

fn nodes_where(conn: &Connection, clause: &str, id: NodeId) -> Result<Vec<NodeRecord>> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM nodes n {clause} ORDER BY n.node_id");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![id], row_to_node)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Fetch a node by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_node(conn: &Connection, id: NodeId) -> Result<Option<NodeRecord>> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM nodes n WHERE n.node_id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_node).optional()?)
}

/// Fetch the lowest-id node with exactly this name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_node_by_name(conn: &Connection, name: &str) -> Result<Option<NodeRecord>> {
    let sql = format!(
        "SELECT {NODE_COLUMNS} FROM nodes n WHERE n.node_name = ?1 ORDER BY n.node_id LIMIT 1"
    );
    Ok(conn.query_row(&sql, params![name], row_to_node).optional()?)
}

/// Fetch the node carrying `alias`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_node_by_alias(conn: &Connection, alias: &str) -> Result<Option<NodeRecord>> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM nodes n WHERE n.node_alias = ?1");
    Ok(conn.query_row(&sql, params![alias], row_to_node).optional()?)
}

/// Direct parents of `id`, ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_parents(conn: &Connection, id: NodeId) -> Result<Vec<NodeRecord>> {
    nodes_where(
        conn,
        "JOIN links l ON l.origin_id = n.node_id WHERE l.dest_id = ?1",
        id,
    )
}

/// Direct children of `id`, ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_children(conn: &Connection, id: NodeId) -> Result<Vec<NodeRecord>> {
    nodes_where(
        conn,
        "JOIN links l ON l.dest_id = n.node_id WHERE l.origin_id = ?1",
        id,
    )
}

/// Every node without a parent, ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_roots(conn: &Connection) -> Result<Vec<NodeRecord>> {
    let sql = format!(
        "SELECT {NODE_COLUMNS} FROM nodes n
         WHERE NOT EXISTS (SELECT 1 FROM links l WHERE l.dest_id = n.node_id)
         ORDER BY n.node_id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([], row_to_node)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Insert a node and return its stored record.
///
/// # Errors
///
/// Returns an error if the insert violates a constraint or fails.
pub fn insert_node(conn: &Connection, name: &str, created_at: i64) -> Result<NodeRecord> {
    conn.execute(
        "INSERT INTO nodes (node_name, node_created) VALUES (?1, ?2)",
        params![name, created_at],
    )?;
    Ok(NodeRecord::new(
        NodeId(conn.last_insert_rowid()),
        name,
        created_at,
    ))
}

/// Insert the `origin -> dest` edge.
///
/// # Errors
///
/// Duplicate edges and self-links surface as `Forbidden`, unknown endpoints
/// as `NotFound`.
pub fn insert_link(conn: &Connection, origin: NodeId, dest: NodeId) -> Result<Link> {
    conn.execute(
        "INSERT INTO links (origin_id, dest_id) VALUES (?1, ?2)",
        params![origin, dest],
    )?;
    Ok(Link {
        id: conn.last_insert_rowid(),
        origin,
        dest,
    })
}

/// Fetch the `origin -> dest` edge if present.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_link(conn: &Connection, origin: NodeId, dest: NodeId) -> Result<Option<Link>> {
    Ok(conn
        .query_row(
            "SELECT link_id, origin_id, dest_id FROM links WHERE origin_id = ?1 AND dest_id = ?2",
            params![origin, dest],
            row_to_link,
        )
        .optional()?)
}

/// Delete the `origin -> dest` edge. Returns whether a row was removed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_link(conn: &Connection, origin: NodeId, dest: NodeId) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM links WHERE origin_id = ?1 AND dest_id = ?2",
        params![origin, dest],
    )?;
    Ok(removed > 0)
}

/// Delete a node; its links go with it. Returns whether a row was removed.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub fn delete_node(conn: &Connection, id: NodeId) -> Result<bool> {
    let removed = conn.execute("DELETE FROM nodes WHERE node_id = ?1", params![id])?;
    Ok(removed > 0)
}

/// Persist a completion timestamp (or clear it).
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_completed(conn: &Connection, id: NodeId, completed_at: Option<i64>) -> Result<()> {
    conn.execute(
        "UPDATE nodes SET node_completed = ?2 WHERE node_id = ?1",
        params![id, completed_at],
    )?;
    Ok(())
}

/// Rename a node.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn rename_node(conn: &Connection, id: NodeId, name: &str) -> Result<()> {
    conn.execute(
        "UPDATE nodes SET node_name = ?2 WHERE node_id = ?1",
        params![id, name],
    )?;
    Ok(())
}

/// Set or clear a node's alias.
///
/// # Errors
///
/// An alias held by another node surfaces as `Forbidden`.
pub fn set_alias(conn: &Connection, id: NodeId, alias: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE nodes SET node_alias = ?2 WHERE node_id = ?1",
        params![id, alias],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::error::{Error, Forbidden};

    fn names(records: &[NodeRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn insert_and_fetch_round_trip() -> Result<()> {
        let conn = open_in_memory()?;
        let a = insert_node(&conn, "a", 100)?;
        assert_eq!(a.id, NodeId(1));

        let fetched = get_node(&conn, a.id)?.expect("node a");
        assert_eq!(fetched, a);
        assert!(get_node(&conn, NodeId(42))?.is_none());
        Ok(())
    }

    #[test]
    fn parents_and_children_are_ordered_by_id() -> Result<()> {
        let conn = open_in_memory()?;
        let root = insert_node(&conn, "root", 0)?;
        let c3 = insert_node(&conn, "c3", 0)?;
        let c1 = insert_node(&conn, "c1", 0)?;
        let other = insert_node(&conn, "other", 0)?;
        insert_link(&conn, root.id, c1.id)?;
        insert_link(&conn, root.id, c3.id)?;
        insert_link(&conn, other.id, c1.id)?;

        assert_eq!(names(&get_children(&conn, root.id)?), vec!["c3", "c1"]);
        assert_eq!(names(&get_parents(&conn, c1.id)?), vec!["root", "other"]);
        assert_eq!(names(&get_roots(&conn)?), vec!["root", "other"]);
        Ok(())
    }

    #[test]
    fn duplicate_and_self_links_are_forbidden() -> Result<()> {
        let conn = open_in_memory()?;
        let a = insert_node(&conn, "a", 0)?;
        let b = insert_node(&conn, "b", 0)?;
        let link = insert_link(&conn, a.id, b.id)?;
        assert_eq!(get_link(&conn, a.id, b.id)?, Some(link));

        assert!(matches!(
            insert_link(&conn, a.id, b.id),
            Err(Error::Forbidden(Forbidden::Constraint(_)))
        ));
        assert!(matches!(
            insert_link(&conn, a.id, a.id),
            Err(Error::Forbidden(Forbidden::Constraint(_)))
        ));
        assert!(matches!(
            insert_link(&conn, a.id, NodeId(99)),
            Err(Error::NotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn deleting_a_node_cascades_to_links() -> Result<()> {
        let conn = open_in_memory()?;
        let a = insert_node(&conn, "a", 0)?;
        let b = insert_node(&conn, "b", 0)?;
        insert_link(&conn, a.id, b.id)?;

        assert!(delete_node(&conn, a.id)?);
        assert!(get_link(&conn, a.id, b.id)?.is_none());
        assert!(get_parents(&conn, b.id)?.is_empty());
        assert!(!delete_node(&conn, a.id)?);
        Ok(())
    }

    #[test]
    fn updates_touch_one_row() -> Result<()> {
        let conn = open_in_memory()?;
        let a = insert_node(&conn, "a", 0)?;
        let b = insert_node(&conn, "b", 0)?;

        set_completed(&conn, a.id, Some(77))?;
        rename_node(&conn, a.id, "renamed")?;
        set_alias(&conn, a.id, Some("aa"))?;

        let a = get_node(&conn, a.id)?.expect("a");
        assert_eq!(a.completed_at, Some(77));
        assert_eq!(a.name, "renamed");
        assert_eq!(get_node_by_alias(&conn, "aa")?.map(|n| n.id), Some(a.id));
        assert_eq!(get_node_by_name(&conn, "b")?.map(|n| n.id), Some(b.id));

        assert!(matches!(
            set_alias(&conn, b.id, Some("aa")),
            Err(Error::Forbidden(_))
        ));
        set_alias(&conn, a.id, None)?;
        assert!(get_node_by_alias(&conn, "aa")?.is_none());
        Ok(())
    }

    #[test]
    fn delete_link_reports_missing_edge() -> Result<()> {
        let conn = open_in_memory()?;
        let a = insert_node(&conn, "a", 0)?;
        let b = insert_node(&conn, "b", 0)?;
        assert!(!delete_link(&conn, a.id, b.id)?);
        insert_link(&conn, a.id, b.id)?;
        assert!(delete_link(&conn, a.id, b.id)?);
        Ok(())
    }
}
