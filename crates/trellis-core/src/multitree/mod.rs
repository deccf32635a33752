//! In-memory multitree: one loaded connected component.
//!
//! Nodes live in an arena indexed by position; adjacency is stored as index
//! lists on both sides, so there are no reference cycles and a component is
//! dropped wholesale when the operation that loaded it finishes.
//!
//! Child and parent lists keep insertion order until
//! [`Multitree::sort_adjacency`] orders them by id, which the loader does
//! so rendering is deterministic.

pub mod status;
pub mod traverse;
pub mod validate;

use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::ControlFlow;

use crate::model::{NodeId, NodeRecord};

pub use status::{CompletionChange, TaskStatus};
pub use traverse::{Direction, SearchState};
pub use validate::LinkViolation;

/// Adjacency errors from the arena mutators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("link {origin} -> {dest} already exists")]
    AlreadyExists { origin: NodeId, dest: NodeId },

    #[error("link {origin} -> {dest} does not exist")]
    NotFound { origin: NodeId, dest: NodeId },

    #[error("node {0} cannot be linked to itself")]
    SelfLink(NodeId),

    #[error("node {0} is not part of this multitree")]
    UnknownNode(NodeId),

    #[error(transparent)]
    Violation(#[from] LinkViolation),
}

/// Arena of node records plus two-sided adjacency.
#[derive(Debug, Clone, Default)]
pub struct Multitree {
    records: Vec<NodeRecord>,
    index: HashMap<NodeId, usize>,
    parents: Vec<Vec<usize>>,
    children: Vec<Vec<usize>>,
}

impl Multitree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single disconnected node standing in for a date that has no row yet.
    #[must_use]
    pub fn synthetic_date(name: &str, now: i64) -> Self {
        let mut tree = Self::new();
        tree.insert(NodeRecord::new(NodeId::SYNTHETIC, name, now));
        tree
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of parent -> child edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.children.iter().map(Vec::len).sum()
    }

    /// Add a bare node. Re-inserting a known id keeps the first record.
    pub fn insert(&mut self, record: NodeRecord) -> NodeId {
        let id = record.id;
        if self.index.contains_key(&id) {
            return id;
        }
        self.index.insert(id, self.records.len());
        self.records.push(record);
        self.parents.push(Vec::new());
        self.children.push(Vec::new());
        id
    }

    /// Copy every node and edge of `other` into this arena, merging by id.
    pub fn absorb(&mut self, other: &Self) {
        for record in &other.records {
            self.insert(record.clone());
        }
        for (from, kids) in other.children.iter().enumerate() {
            let origin = other.records[from].id;
            for &to in kids {
                let dest = other.records[to].id;
                // Edges shared by both arenas are expected here.
                let _ = self.add_child(origin, dest);
            }
        }
    }

    /// Register `child` under `parent`, updating both sides.
    ///
    /// # Errors
    ///
    /// Fails without side effects on self-links, unknown ids or an edge that
    /// is already present.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LinkError> {
        if parent == child {
            return Err(LinkError::SelfLink(parent));
        }
        let p = self.slot(parent)?;
        let c = self.slot(child)?;
        if self.children[p].contains(&c) {
            return Err(LinkError::AlreadyExists {
                origin: parent,
                dest: child,
            });
        }
        self.children[p].push(c);
        self.parents[c].push(p);
        Ok(())
    }

    /// Same edge as [`Self::add_child`], named from the child's side.
    ///
    /// # Errors
    ///
    /// See [`Self::add_child`].
    pub fn add_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), LinkError> {
        self.add_child(parent, child)
    }

    /// Remove the `parent -> child` edge from both sides.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotFound`] if the edge is absent.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), LinkError> {
        let p = self.slot(parent)?;
        let c = self.slot(child)?;
        let Some(pos) = self.children[p].iter().position(|&k| k == c) else {
            return Err(LinkError::NotFound {
                origin: parent,
                dest: child,
            });
        };
        self.children[p].remove(pos);
        self.parents[c].retain(|&k| k != p);
        Ok(())
    }

    /// Same edge as [`Self::remove_child`], named from the child's side.
    ///
    /// # Errors
    ///
    /// See [`Self::remove_child`].
    pub fn remove_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), LinkError> {
        self.remove_child(parent, child)
    }

    /// Validate and then add the `origin -> dest` edge.
    ///
    /// # Errors
    ///
    /// Returns the [`LinkViolation`] found by [`validate::validate_link`];
    /// the arena is untouched in that case.
    pub fn link(&mut self, origin: NodeId, dest: NodeId) -> Result<(), LinkError> {
        validate::validate_link(self, origin, self, dest)?;
        self.add_child(origin, dest)
    }

    /// Detach `id` from all neighbours and drop it from the arena.
    pub fn remove_node(&mut self, id: NodeId) -> Option<NodeRecord> {
        let slot = self.index.remove(&id)?;
        for p in std::mem::take(&mut self.parents[slot]) {
            self.children[p].retain(|&k| k != slot);
        }
        for c in std::mem::take(&mut self.children[slot]) {
            self.parents[c].retain(|&k| k != slot);
        }

        let last = self.records.len() - 1;
        let record = self.records.swap_remove(slot);
        self.parents.swap_remove(slot);
        self.children.swap_remove(slot);
        if slot != last {
            self.index.insert(self.records[slot].id, slot);
            for list in self.parents.iter_mut().chain(self.children.iter_mut()) {
                for k in list.iter_mut() {
                    if *k == last {
                        *k = slot;
                    }
                }
            }
        }
        Some(record)
    }

    /// Order every parent and child list by node id.
    pub fn sort_adjacency(&mut self) {
        let records = &self.records;
        for list in self.parents.iter_mut().chain(self.children.iter_mut()) {
            list.sort_unstable_by_key(|&slot| records[slot].id);
        }
    }

    /// Read view of a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.index.get(&id).map(|&slot| NodeRef { tree: self, slot })
    }

    /// Records in arena order.
    pub fn records(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.iter()
    }

    /// Overwrite a node's completion timestamp. Returns whether it changed.
    pub fn set_completed(&mut self, id: NodeId, completed_at: Option<i64>) -> bool {
        let Some(&slot) = self.index.get(&id) else {
            return false;
        };
        let record = &mut self.records[slot];
        if record.completed_at == completed_at {
            return false;
        }
        record.completed_at = completed_at;
        true
    }

    /// Every id in the arena, sorted.
    #[must_use]
    pub fn all(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.records.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids
    }

    /// The connected component containing `id`, sorted.
    #[must_use]
    pub fn component(&self, id: NodeId) -> Vec<NodeId> {
        let mut ids = self.reachable(id, Direction::Both);
        if self.contains(id) {
            ids.push(id);
        }
        ids.sort_unstable();
        ids
    }

    /// Everything below `id`, each node once, breadth first.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.reachable(id, Direction::Down)
    }

    /// Everything above `id`, each node once, breadth first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.reachable(id, Direction::Up)
    }

    /// Roots above `id` (or `id` itself when it has no parents), sorted.
    #[must_use]
    pub fn roots(&self, id: NodeId) -> Vec<NodeId> {
        self.filter_sorted(self.ancestors(id).into_iter().chain([id]), |n| n.is_root())
    }

    #[must_use]
    pub fn roots_all(&self) -> Vec<NodeId> {
        self.filter_sorted(self.all(), |n| n.is_root())
    }

    /// Leaves below `id`, including `id` if it is a leaf, sorted.
    #[must_use]
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.filter_sorted(self.descendants(id).into_iter().chain([id]), |n| n.is_leaf())
    }

    #[must_use]
    pub fn leaves_all(&self) -> Vec<NodeId> {
        self.filter_sorted(self.all(), |n| n.is_leaf())
    }

    /// Copy of the subtree under `id` where every node keeps only the parent
    /// it was first reached through.
    #[must_use]
    pub fn tree(&self, id: NodeId) -> Self {
        let mut out = Self::new();
        let Some(root) = self.node(id) else {
            return out;
        };
        out.insert(root.record().clone());

        let mut queue = VecDeque::from([root.slot]);
        while let Some(slot) = queue.pop_front() {
            let parent = self.records[slot].id;
            for &c in &self.children[slot] {
                let record = &self.records[c];
                if out.contains(record.id) {
                    continue;
                }
                out.insert(record.clone());
                // Both ids were just inserted and are distinct.
                let _ = out.add_child(parent, record.id);
                queue.push_back(c);
            }
        }
        out
    }

    /// Depth-first walk from `start`; see [`traverse::dfs`].
    pub fn dfs<F>(&self, start: NodeId, direction: Direction, visit: F) -> ControlFlow<()>
    where
        F: FnMut(NodeRef<'_>) -> ControlFlow<()>,
    {
        traverse::dfs(self, start, direction, visit)
    }

    fn reachable(&self, id: NodeId, direction: Direction) -> Vec<NodeId> {
        let Some(&start) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(slot) = queue.pop_front() {
            for &next in self.neighbours(slot, direction) {
                if seen.insert(next) {
                    out.push(self.records[next].id);
                    queue.push_back(next);
                }
            }
        }
        out
    }

    fn filter_sorted<I, F>(&self, ids: I, keep: F) -> Vec<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
        F: Fn(&NodeRef<'_>) -> bool,
    {
        let mut out: Vec<NodeId> = ids
            .into_iter()
            .filter(|id| self.node(*id).is_some_and(|n| keep(&n)))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub(crate) fn neighbours(
        &self,
        slot: usize,
        direction: Direction,
    ) -> Box<dyn Iterator<Item = &usize> + '_> {
        match direction {
            Direction::Down => Box::new(self.children[slot].iter()),
            Direction::Up => Box::new(self.parents[slot].iter()),
            Direction::Both => Box::new(self.parents[slot].iter().chain(&self.children[slot])),
        }
    }

    pub(crate) fn slot_of(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) const fn view(&self, slot: usize) -> NodeRef<'_> {
        NodeRef { tree: self, slot }
    }

    pub(crate) fn child_slots(&self, slot: usize) -> &[usize] {
        &self.children[slot]
    }

    pub(crate) fn parent_slots(&self, slot: usize) -> &[usize] {
        &self.parents[slot]
    }

    fn slot(&self, id: NodeId) -> Result<usize, LinkError> {
        self.slot_of(id).ok_or(LinkError::UnknownNode(id))
    }
}

/// Borrowed view of one node inside a [`Multitree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Multitree,
    slot: usize,
}

impl<'a> NodeRef<'a> {
    #[must_use]
    pub fn record(&self) -> &'a NodeRecord {
        &self.tree.records[self.slot]
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.record().id
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.record().name
    }

    #[must_use]
    pub fn alias(&self) -> Option<&'a str> {
        self.record().alias.as_deref()
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<i64> {
        self.record().completed_at
    }

    pub fn parents(&self) -> impl Iterator<Item = NodeRef<'a>> + use<'a> {
        let tree = self.tree;
        tree.parents[self.slot].iter().map(move |&slot| NodeRef { tree, slot })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + use<'a> {
        let tree = self.tree;
        tree.children[self.slot].iter().map(move |&slot| NodeRef { tree, slot })
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.tree.parents[self.slot].is_empty()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.tree.children[self.slot].is_empty()
    }

    #[must_use]
    pub fn is_date_node(&self) -> bool {
        self.record().is_date_node()
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        TaskStatus::of(self.tree, self.id())
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
