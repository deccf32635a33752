//! Depth-first traversal with three-colour marking.

use std::ops::ControlFlow;

use super::{Multitree, NodeRef};
use crate::model::NodeId;

/// DFS discovery state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Not discovered yet.
    White,
    /// Discovered, descendants still being explored.
    Gray,
    /// Finished.
    Black,
}

/// Which edges a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Parent to child.
    Down,
    /// Child to parent.
    Up,
    /// Either way, treating the multitree as undirected.
    Both,
}

/// Visit every node reachable from `start` in pre-order, each once.
///
/// The visitor may return [`ControlFlow::Break`] to stop early; the break is
/// passed back to the caller.
pub fn dfs<F>(tree: &Multitree, start: NodeId, direction: Direction, mut visit: F) -> ControlFlow<()>
where
    F: FnMut(NodeRef<'_>) -> ControlFlow<()>,
{
    let Some(start) = tree.slot_of(start) else {
        return ControlFlow::Continue(());
    };

    let mut state = vec![SearchState::White; tree.len()];
    let mut stack = vec![start];
    while let Some(slot) = stack.pop() {
        if state[slot] != SearchState::White {
            continue;
        }
        state[slot] = SearchState::Gray;
        visit(tree.view(slot))?;

        // Reverse so the first neighbour is visited first.
        let next: Vec<usize> = tree.neighbours(slot, direction).copied().collect();
        stack.extend(next.into_iter().rev().filter(|&n| state[n] == SearchState::White));
        state[slot] = SearchState::Black;
    }
    ControlFlow::Continue(())
}

/// Slots of the subtree under `start` in post-order (children before
/// parents), each once.
pub(crate) fn post_order(tree: &Multitree, start: usize) -> Vec<usize> {
    let mut state = vec![SearchState::White; tree.len()];
    let mut out = Vec::new();
    // (slot, index of the next child to explore)
    let mut stack = vec![(start, 0_usize)];
    state[start] = SearchState::Gray;

    while let Some(top) = stack.last_mut() {
        let slot = top.0;
        if let Some(&child) = tree.child_slots(slot).get(top.1) {
            top.1 += 1;
            if state[child] == SearchState::White {
                state[child] = SearchState::Gray;
                stack.push((child, 0));
            }
        } else {
            state[slot] = SearchState::Black;
            out.push(slot);
            stack.pop();
        }
    }
    out
}
