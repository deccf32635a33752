//! Rebuild the connected component around a node from the flat edge table.
//!
//! Breadth-first from the target row: for each dequeued node, fetch its
//! parents and children (one indexed query each). Unseen neighbours are
//! inserted, linked and queued; seen ones are only linked, so a node
//! reachable by several paths exists once in memory. Stored edges are
//! trusted and not re-validated.
//!
//! Neighbour lists are sorted by id once loading finishes, so the shape of
//! the result does not depend on which member the walk started from.

use std::collections::{HashSet, VecDeque};

use rusqlite::Connection;

use super::query;
use crate::error::Result;
use crate::model::NodeId;
use crate::multitree::{LinkError, Multitree};

/// Load the whole component containing `id`, or `None` if there is no such
/// row.
///
/// # Errors
///
/// Returns an error if a storage query fails.
pub fn load_component(conn: &Connection, id: NodeId) -> Result<Option<Multitree>> {
    let Some(start) = query::get_node(conn, id)? else {
        return Ok(None);
    };

    let mut tree = Multitree::new();
    tree.insert(start);
    let mut visited = HashSet::from([id]);
    let mut queue = VecDeque::from([id]);

    while let Some(current) = queue.pop_front() {
        for parent in query::get_parents(conn, current)? {
            let parent_id = parent.id;
            if visited.insert(parent_id) {
                tree.insert(parent);
                queue.push_back(parent_id);
            }
            link(&mut tree, parent_id, current);
        }
        for child in query::get_children(conn, current)? {
            let child_id = child.id;
            if visited.insert(child_id) {
                tree.insert(child);
                queue.push_back(child_id);
            }
            link(&mut tree, current, child_id);
        }
    }

    tree.sort_adjacency();
    tracing::debug!(
        %id,
        nodes = tree.len(),
        edges = tree.edge_count(),
        "loaded component"
    );
    Ok(Some(tree))
}

fn link(tree: &mut Multitree, parent: NodeId, child: NodeId) {
    match tree.add_child(parent, child) {
        // Every edge is seen from both of its ends.
        Ok(()) | Err(LinkError::AlreadyExists { .. }) => {}
        Err(err) => tracing::warn!(%parent, %child, error = %err, "skipping stored link"),
    }
}
