//! Completion status: derived states and bottom-up propagation.
//!
//! Only `completed_at` is stored. A non-leaf node is completed exactly when
//! all of its direct children are; leaves keep whatever was set on them
//! explicitly. After a check, uncheck or structural change the affected
//! nodes are re-evaluated upward until nothing flips any more.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use serde::Serialize;

use super::Multitree;
use super::traverse::post_order;
use crate::model::NodeId;

/// Derived task state shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    InProgress,
    Inactive,
}

impl TaskStatus {
    /// Completed if `completed_at` is set, in progress if any descendant is
    /// completed, otherwise inactive.
    #[must_use]
    pub fn of(tree: &Multitree, id: NodeId) -> Self {
        let Some(node) = tree.node(id) else {
            return Self::Inactive;
        };
        if node.completed_at().is_some() {
            return Self::Completed;
        }
        let started = tree
            .descendants(id)
            .into_iter()
            .filter_map(|d| tree.node(d))
            .any(|d| d.completed_at().is_some());
        if started { Self::InProgress } else { Self::Inactive }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::InProgress => "in progress",
            Self::Inactive => "inactive",
        })
    }
}

/// A node whose persisted completion must be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionChange {
    pub id: NodeId,
    pub completed_at: Option<i64>,
}

/// Set `value` explicitly on `target` and every node below it.
///
/// Returns the nodes whose value actually changed.
pub fn force_completion(
    tree: &mut Multitree,
    target: NodeId,
    value: Option<i64>,
) -> Vec<CompletionChange> {
    if !tree.contains(target) {
        return Vec::new();
    }
    let mut changes = Vec::new();
    for id in std::iter::once(target).chain(tree.descendants(target)) {
        if tree.set_completed(id, value) {
            changes.push(CompletionChange {
                id,
                completed_at: value,
            });
        }
    }
    changes
}

/// Recompute derived completion around `start` until a fixed point.
///
/// The worklist starts with the nodes under `start` in post-order, followed
/// by every parent of those nodes that lies outside the subtree. A popped
/// non-leaf flips when "all children completed" disagrees with its stored
/// state: to the latest child timestamp when completing, to `None` when
/// not. Parents of a flipped node are queued again. Each changed node is
/// reported once, with its final value.
pub fn propagate(tree: &mut Multitree, start: NodeId) -> Vec<CompletionChange> {
    let Some(start_slot) = tree.slot_of(start) else {
        return Vec::new();
    };

    let subtree = post_order(tree, start_slot);
    let mut queued: HashSet<usize> = subtree.iter().copied().collect();
    let mut queue: VecDeque<usize> = subtree.iter().copied().collect();
    // Parents outside the subtree: `start`'s own, and those of shared
    // descendants.
    for &slot in &subtree {
        for &parent in tree.parent_slots(slot) {
            if queued.insert(parent) {
                queue.push_back(parent);
            }
        }
    }

    let mut original: HashMap<NodeId, Option<i64>> = HashMap::new();
    let mut order = Vec::new();

    while let Some(slot) = queue.pop_front() {
        queued.remove(&slot);
        let node = tree.view(slot);
        if node.is_leaf() {
            continue;
        }

        let mut all_done = true;
        let mut latest = None;
        for child in node.children() {
            match child.completed_at() {
                Some(ts) => latest = latest.max(Some(ts)),
                None => all_done = false,
            }
        }
        let stored = node.completed_at();
        if all_done == stored.is_some() {
            continue;
        }

        let id = node.id();
        let next = if all_done { latest } else { None };
        original.entry(id).or_insert_with(|| {
            order.push(id);
            stored
        });
        tree.set_completed(id, next);

        for &parent in tree.parent_slots(slot) {
            if queued.insert(parent) {
                queue.push_back(parent);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| {
            let now = tree.node(id)?.completed_at();
            (original.get(&id) != Some(&now)).then_some(CompletionChange {
                id,
                completed_at: now,
            })
        })
        .collect()
}
