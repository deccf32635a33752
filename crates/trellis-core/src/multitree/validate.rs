//! Link validation: reject edges that would break the multitree shape.
//!
//! # Overview
//!
//! A multitree is a DAG with at most one directed path between any ordered
//! pair of nodes. A proposed edge `origin -> dest` is checked against a
//! scratch copy of the adjacency tables of both components; the real arena
//! is never touched speculatively.
//!
//! # Checks
//!
//! 1. self-link, existing edge and date-node destination are rejected
//!    outright;
//! 2. **cycle**: three-colour DFS over child edges from every root (and from
//!    any node left undiscovered); an edge into a Gray node is a back edge;
//! 3. **diamond**: DFS from each root on its own; an edge into a node that
//!    is already Black means the root reaches it twice.
//!
//! Forward and cross edges are not told apart, since both mean a second
//! path exists. Each check is O(V+E) per start node.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashMap;

use super::Multitree;
use super::traverse::SearchState;
use crate::model::NodeId;

/// Why a proposed link was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinkViolation {
    #[error("a node cannot be linked to itself")]
    SelfLink,

    #[error("link already exists")]
    AlreadyExists,

    #[error("date nodes must stay roots and cannot gain a parent")]
    DateNodeDest,

    #[error("link would create a cycle")]
    Cycle,

    #[error("link would create a diamond (a second path between two nodes)")]
    Diamond,
}

/// Check whether `origin -> dest` may be added.
///
/// `origin_tree` and `dest_tree` are the loaded components of the two
/// endpoints; they may be the same arena or two loads of the same component.
///
/// # Errors
///
/// Returns the first [`LinkViolation`] found, in the order listed in the
/// module docs.
pub fn validate_link(
    origin_tree: &Multitree,
    origin: NodeId,
    dest_tree: &Multitree,
    dest: NodeId,
) -> Result<(), LinkViolation> {
    if origin == dest {
        return Err(LinkViolation::SelfLink);
    }
    if origin_tree
        .node(origin)
        .is_some_and(|n| n.children().any(|c| c.id() == dest))
    {
        return Err(LinkViolation::AlreadyExists);
    }
    if dest_tree.node(dest).is_some_and(|n| n.is_date_node()) {
        return Err(LinkViolation::DateNodeDest);
    }

    let mut scratch = Scratch::default();
    scratch.copy(origin_tree);
    scratch.copy(dest_tree);
    let from = scratch.slot(origin);
    let to = scratch.slot(dest);
    scratch.add_edge(from, to);

    if scratch.has_cycle() {
        return Err(LinkViolation::Cycle);
    }
    if scratch.has_diamond() {
        return Err(LinkViolation::Diamond);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scratch adjacency
// ---------------------------------------------------------------------------

/// Index and child tables only, merged by node identity.
#[derive(Default)]
struct Scratch {
    index: HashMap<NodeId, usize>,
    children: Vec<Vec<usize>>,
    indegree: Vec<usize>,
}

impl Scratch {
    fn slot(&mut self, id: NodeId) -> usize {
        if let Some(&slot) = self.index.get(&id) {
            return slot;
        }
        let slot = self.children.len();
        self.index.insert(id, slot);
        self.children.push(Vec::new());
        self.indegree.push(0);
        slot
    }

    fn add_edge(&mut self, from: usize, to: usize) {
        if !self.children[from].contains(&to) {
            self.children[from].push(to);
            self.indegree[to] += 1;
        }
    }

    fn copy(&mut self, tree: &Multitree) {
        for (slot, record) in tree.records().enumerate() {
            let from = self.slot(record.id);
            for &child in tree.child_slots(slot) {
                let to = self.slot(tree.view(child).id());
                self.add_edge(from, to);
            }
        }
    }

    fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.children.len()).filter(|&slot| self.indegree[slot] == 0)
    }

    fn has_cycle(&self) -> bool {
        let mut color = vec![SearchState::White; self.children.len()];
        // Roots first; anything still white afterwards sits on or below a
        // cycle and serves as a synthetic root.
        let starts: Vec<usize> = self.roots().chain(0..self.children.len()).collect();
        for start in starts {
            if color[start] != SearchState::White {
                continue;
            }
            if self.walk(start, &mut color, SearchState::Gray) {
                return true;
            }
        }
        false
    }

    fn has_diamond(&self) -> bool {
        let mut color = vec![SearchState::White; self.children.len()];
        for root in self.roots() {
            color.fill(SearchState::White);
            // Gray is unreachable here once the cycle check passed.
            if self.walk(root, &mut color, SearchState::Black) {
                return true;
            }
        }
        false
    }

    /// Iterative DFS from `start`. Returns `true` as soon as an edge lands on
    /// a node coloured `trip` (Gray for back edges, Black for second paths).
    fn walk(&self, start: usize, color: &mut [SearchState], trip: SearchState) -> bool {
        color[start] = SearchState::Gray;
        // (slot, index of the next child to explore)
        let mut stack = vec![(start, 0_usize)];
        while let Some(top) = stack.last_mut() {
            let slot = top.0;
            if let Some(&child) = self.children[slot].get(top.1) {
                top.1 += 1;
                match color[child] {
                    SearchState::White => {
                        color[child] = SearchState::Gray;
                        stack.push((child, 0));
                    }
                    state if state == trip => return true,
                    _ => {}
                }
            } else {
                color[slot] = SearchState::Black;
                stack.pop();
            }
        }
        false
    }
}
