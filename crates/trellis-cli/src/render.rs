//! Text and JSON views of nodes: single lines, trees and neighbourhoods.

use std::fmt::Write as _;
use std::io::{self, Write};

use chrono::{DateTime, Local};
use serde::Serialize;
use trellis_core::{NodeId, NodeRecord, NodeRef, TaskStatus};

pub const fn checkbox(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "[x]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Inactive => "[ ]",
    }
}

/// `(id)` or `(id:alias)`; unpersisted date nodes have no id to show.
fn id_tag(record: &NodeRecord) -> String {
    if record.id.is_synthetic() {
        return String::new();
    }
    match &record.alias {
        Some(alias) => format!(" ({}:{alias})", record.id),
        None => format!(" ({})", record.id),
    }
}

/// `[~] name (id)` with the status derived from the loaded component.
pub fn node_line(node: NodeRef<'_>) -> String {
    format!("{} {}{}", checkbox(node.status()), node.name(), id_tag(node.record()))
}

/// Like [`node_line`] for a bare record, which only knows whether it was
/// checked.
pub fn record_line(record: &NodeRecord) -> String {
    let status = if record.is_completed() {
        TaskStatus::Completed
    } else {
        TaskStatus::Inactive
    };
    format!("{} {}{}", checkbox(status), record.name, id_tag(record))
}

/// Local wall-clock rendering of a Unix timestamp.
pub fn format_time(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0).map_or_else(
        || ts.to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// Write the subtree under `node`, one line per node:
///
/// ```text
/// [~] Clean up the house (234)
///  ├──[x] Clean up the desk (236)
///  │   └──[x] Dust the lamp (240)
///  └──[ ] Make the bed (238)
/// ```
pub fn write_tree(w: &mut dyn Write, node: NodeRef<'_>) -> io::Result<()> {
    write_branch(w, node, &mut Vec::new())
}

/// `open[i]` says whether the ancestor at depth `i + 1` has siblings below.
fn write_branch(w: &mut dyn Write, node: NodeRef<'_>, open: &mut Vec<bool>) -> io::Result<()> {
    let mut indent = String::new();
    if let Some((last, above)) = open.split_last() {
        for &more in above {
            indent.push_str(if more { " │  " } else { "    " });
        }
        indent.push_str(if *last { " ├──" } else { " └──" });
    }
    writeln!(w, "{indent}{}", node_line(node))?;

    let count = node.children().count();
    for (i, child) in node.children().enumerate() {
        open.push(i + 1 < count);
        write_branch(w, child, open)?;
        open.pop();
    }
    Ok(())
}

/// Parents on the left, children on the right:
///
/// ```text
///  (45) ───┐
/// (150) ───┴─── (123) ───┬─── (124)
///                        └─── (125)
/// ```
pub fn neighbours(node: NodeRef<'_>) -> String {
    let parents: Vec<String> = node.parents().map(|p| format!("({})", p.id())).collect();
    let children: Vec<String> = node.children().map(|c| format!("({})", c.id())).collect();
    let width = parents.iter().map(|p| p.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    let mut left = 0;
    match parents.as_slice() {
        [] => {}
        [only] => {
            let _ = write!(out, "{only:>width$} ──── ");
            left = width + 6;
        }
        many => {
            let last = many.len() - 1;
            for (i, parent) in many.iter().enumerate() {
                let joint = match i {
                    0 => " ───┐\n",
                    i if i == last => " ───┴─── ",
                    _ => " ───┤\n",
                };
                let _ = write!(out, "{parent:>width$}{joint}");
            }
            left = width + 9;
        }
    }

    let id = format!("({})", node.id());
    left += id.chars().count();
    out.push_str(&id);

    match children.as_slice() {
        [] => out.push('\n'),
        [only] => {
            let _ = writeln!(out, " ──── {only}");
        }
        many => {
            let pad = " ".repeat(left);
            let last = many.len() - 1;
            for (i, child) in many.iter().enumerate() {
                let _ = match i {
                    0 => writeln!(out, " ───┬─── {child}"),
                    i if i == last => writeln!(out, "{pad}    └─── {child}"),
                    _ => writeln!(out, "{pad}    ├─── {child}"),
                };
            }
        }
    }
    out
}

/// JSON shape of one node.
#[derive(Debug, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub status: TaskStatus,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl From<NodeRef<'_>> for NodeView {
    fn from(node: NodeRef<'_>) -> Self {
        let record = node.record();
        Self {
            id: record.id,
            name: record.name.clone(),
            alias: record.alias.clone(),
            status: node.status(),
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}

/// JSON shape of a subtree.
#[derive(Debug, Serialize)]
pub struct TreeView {
    #[serde(flatten)]
    pub node: NodeView,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
}

impl From<NodeRef<'_>> for TreeView {
    fn from(node: NodeRef<'_>) -> Self {
        Self {
            node: NodeView::from(node),
            children: node.children().map(Self::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::Multitree;

    fn tree(nodes: &[(i64, &str)], edges: &[(i64, i64)]) -> Multitree {
        let mut tree = Multitree::new();
        for &(id, name) in nodes {
            tree.insert(NodeRecord::new(NodeId(id), name, 0));
        }
        for &(parent, child) in edges {
            tree.add_child(NodeId(parent), NodeId(child)).expect("edge");
        }
        tree
    }

    fn tree_string(tree: &Multitree, id: i64) -> String {
        let mut buf = Vec::new();
        write_tree(&mut buf, tree.node(NodeId(id)).expect("node")).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn node_line_shows_status_and_alias() {
        let mut tree = tree(&[(1, "house"), (2, "desk")], &[(1, 2)]);
        assert_eq!(node_line(tree.node(NodeId(1)).expect("node")), "[ ] house (1)");

        tree.set_completed(NodeId(2), Some(5));
        assert_eq!(node_line(tree.node(NodeId(1)).expect("node")), "[~] house (1)");
        assert_eq!(node_line(tree.node(NodeId(2)).expect("node")), "[x] desk (2)");

        let mut record = NodeRecord::new(NodeId(3), "work", 0);
        record.alias = Some("w".to_string());
        assert_eq!(record_line(&record), "[ ] work (3:w)");
    }

    #[test]
    fn synthetic_date_has_no_id() {
        let tree = Multitree::synthetic_date("2024-05-01", 0);
        assert_eq!(node_line(tree.node(NodeId::SYNTHETIC).expect("node")), "[ ] 2024-05-01");
    }

    #[test]
    fn tree_uses_box_connectors() {
        let tree = tree(
            &[(1, "a"), (2, "b"), (3, "c"), (4, "d")],
            &[(1, 2), (1, 3), (2, 4)],
        );
        let expected = "\
[ ] a (1)
 ├──[ ] b (2)
 │   └──[ ] d (4)
 └──[ ] c (3)
";
        assert_eq!(tree_string(&tree, 1), expected);
    }

    #[test]
    fn neighbours_single_parent_single_child() {
        let tree = tree(&[(1, "p"), (2, "n"), (3, "c")], &[(1, 2), (2, 3)]);
        assert_eq!(
            neighbours(tree.node(NodeId(2)).expect("node")),
            "(1) ──── (2) ──── (3)\n"
        );
    }

    #[test]
    fn neighbours_fan_in_and_out() {
        let tree = tree(
            &[(1, "a"), (12, "b"), (5, "n"), (7, "x"), (8, "y"), (9, "z")],
            &[(1, 5), (12, 5), (5, 7), (5, 8), (5, 9)],
        );
        let pad = " ".repeat(20);
        let expected = format!(
            " (1) ───┐\n(12) ───┴─── (5) ───┬─── (7)\n{pad}├─── (8)\n{pad}└─── (9)\n"
        );
        assert_eq!(neighbours(tree.node(NodeId(5)).expect("node")), expected);
    }

    #[test]
    fn tree_view_nests_children() {
        let tree = tree(&[(1, "a"), (2, "b")], &[(1, 2)]);
        let json = serde_json::to_value(TreeView::from(tree.node(NodeId(1)).expect("node")))
            .expect("serialize");
        assert_eq!(json["id"], 1);
        assert_eq!(json["status"], "inactive");
        assert_eq!(json["children"][0]["name"], "b");
        assert!(json["children"][0].get("children").is_none());
    }
}
