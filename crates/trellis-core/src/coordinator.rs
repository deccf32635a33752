//! Transactional operations: load, validate, mutate, propagate, commit.
//!
//! Every public operation on [`Trellis`] runs in exactly one SQLite
//! transaction. Mutations take the write lock up front (`BEGIN IMMEDIATE`)
//! so the component read by the loader cannot change before the writes
//! land; reads use a deferred transaction. Any error drops the transaction
//! without committing, which rolls everything back.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::{self, loader, query};
use crate::error::{Error, Forbidden, Result};
use crate::import::Skeleton;
use crate::model::{
    Link, NodeId, NodeRecord, Resolution, Selector, validate_alias, validate_name,
};
use crate::multitree::status::{force_completion, propagate};
use crate::multitree::validate::validate_link;
use crate::multitree::{CompletionChange, LinkViolation, Multitree, NodeRef};

/// A loaded component and the node it was loaded for.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub tree: Multitree,
    pub focus: NodeId,
}

impl Loaded {
    /// The node the component was loaded around.
    #[must_use]
    pub fn focus(&self) -> Option<NodeRef<'_>> {
        self.tree.node(self.focus)
    }
}

/// Outcome of a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Removal {
    /// Deleted nodes, the selected one first.
    pub removed: Vec<NodeRecord>,
    /// Surviving nodes that lost a parent to the delete.
    pub orphaned: Vec<NodeRecord>,
}

/// Handle on one trellis database.
pub struct Trellis {
    conn: Connection,
    config: Config,
}

fn now() -> i64 {
    Utc::now().timestamp()
}

impl Trellis {
    /// Open the database named by `config`, creating and migrating it if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: Config) -> Result<Self> {
        let conn = db::open(&config.database)?;
        Ok(Self { conn, config })
    }

    /// A private in-memory database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
            config: Config::default().with_database(":memory:"),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Create a parentless node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for a bad name, or a storage error.
    pub fn add_root(&mut self, name: &str) -> Result<NodeId> {
        validate_name(name)?;
        let id = self.write("add_root", |tx| Ok(query::insert_node(tx, name, now())?.id))?;
        info!(%id, name, "added root");
        Ok(id)
    }

    /// Create a node under `parent`. A date parent is created on demand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for a bad name, [`Error::NotFound`] if
    /// the parent does not exist, or a storage error.
    pub fn add_child(&mut self, name: &str, parent: &Selector) -> Result<NodeId> {
        validate_name(name)?;
        let (id, parent_id) = self.write("add_child", |tx| {
            let parent = ensure(tx, parent)?;
            let child = query::insert_node(tx, name, now())?;
            query::insert_link(tx, parent.id, child.id)?;

            let mut tree = load(tx, parent.id)?;
            let changes = propagate(&mut tree, parent.id);
            persist(tx, &tree, &changes)?;
            Ok((child.id, parent.id))
        })?;
        info!(%id, parent = %parent_id, name, "added node");
        Ok(id)
    }

    /// Create imported skeletons under `parent`, or as new roots.
    ///
    /// All names are validated before anything is written. Returns the ids
    /// of the skeleton roots in input order. An empty forest writes nothing,
    /// so an unstored date parent stays unstored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for any bad name, [`Error::NotFound`]
    /// if the parent does not exist, or a storage error.
    pub fn add_tree(
        &mut self,
        skeletons: &[Skeleton],
        parent: Option<&Selector>,
    ) -> Result<Vec<NodeId>> {
        for skeleton in skeletons {
            skeleton.validate()?;
        }
        if skeletons.is_empty() {
            debug!("empty import, nothing to write");
            return Ok(Vec::new());
        }
        let ids = self.write("add_tree", |tx| {
            let parent = parent.map(|sel| ensure(tx, sel)).transpose()?;
            let created_at = now();
            let mut roots = Vec::with_capacity(skeletons.len());
            for skeleton in skeletons {
                let root = query::insert_node(tx, &skeleton.name, created_at)?;
                if let Some(parent) = &parent {
                    query::insert_link(tx, parent.id, root.id)?;
                }
                let mut stack = vec![(root.id, skeleton)];
                while let Some((id, node)) = stack.pop() {
                    for child in &node.children {
                        let record = query::insert_node(tx, &child.name, created_at)?;
                        query::insert_link(tx, id, record.id)?;
                        stack.push((record.id, child));
                    }
                }
                roots.push(root.id);
            }

            if let Some(parent) = parent {
                let mut tree = load(tx, parent.id)?;
                let changes = propagate(&mut tree, parent.id);
                persist(tx, &tree, &changes)?;
            }
            Ok(roots)
        })?;
        let nodes: usize = skeletons.iter().map(Skeleton::size).sum();
        info!(roots = ids.len(), nodes, "imported outline");
        Ok(ids)
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Rename a node. Date nodes keep their name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] for date nodes, [`Error::InvalidName`]
    /// for a bad name, or [`Error::NotFound`].
    pub fn rename(&mut self, selector: &Selector, name: &str) -> Result<NodeRecord> {
        let record = self.write("rename", |tx| {
            let node = require(tx, selector)?;
            if node.is_date_node() {
                return Err(Error::Forbidden(Forbidden::DateNodeRename(node.name)));
            }
            validate_name(name)?;
            query::rename_node(tx, node.id, name)?;
            Ok(NodeRecord {
                name: name.to_string(),
                ..node
            })
        })?;
        info!(id = %record.id, name, "renamed node");
        Ok(record)
    }

    /// Set (`Some`) or clear (`None`) a node's alias.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] for a malformed alias,
    /// [`Error::Forbidden`] if another node holds it, or [`Error::NotFound`].
    pub fn set_alias(&mut self, selector: &Selector, alias: Option<&str>) -> Result<NodeRecord> {
        if let Some(alias) = alias {
            validate_alias(alias)?;
        }
        let record = self.write("set_alias", |tx| {
            let node = require(tx, selector)?;
            if let Some(alias) = alias {
                match query::get_node_by_alias(tx, alias)? {
                    Some(owner) if owner.id != node.id => {
                        return Err(Error::Forbidden(Forbidden::AliasTaken(alias.to_string())));
                    }
                    _ => {}
                }
            }
            query::set_alias(tx, node.id, alias)?;
            Ok(NodeRecord {
                alias: alias.map(str::to_string),
                ..node
            })
        })?;
        info!(id = %record.id, alias = ?record.alias, "updated alias");
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Add the `origin -> dest` edge if the result is still a multitree.
    ///
    /// An unpersisted date origin is created on demand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Forbidden`] for self-links, duplicates, date-node
    /// destinations, cycles and diamonds; [`Error::NotFound`] for missing
    /// nodes.
    pub fn link(&mut self, origin: &Selector, dest: &Selector) -> Result<Link> {
        let link = self.write("link", |tx| {
            let dest = match resolve_in(tx, dest)? {
                Resolution::Found(id) => id,
                Resolution::UnpersistedDate(_) => return Err(LinkViolation::DateNodeDest.into()),
            };
            let (mut tree, origin, pending_date) = match resolve_in(tx, origin)? {
                Resolution::Found(id) => (load(tx, id)?, id, None),
                Resolution::UnpersistedDate(name) => (
                    Multitree::synthetic_date(&name, now()),
                    NodeId::SYNTHETIC,
                    Some(name),
                ),
            };
            let dest_tree = load(tx, dest)?;
            validate_link(&tree, origin, &dest_tree, dest)?;

            let origin = match pending_date {
                Some(name) => {
                    let record = query::insert_node(tx, &name, now())?;
                    tree = Multitree::new();
                    tree.insert(record)
                }
                None => origin,
            };
            let link = query::insert_link(tx, origin, dest)?;

            tree.absorb(&dest_tree);
            tree.add_child(origin, dest)?;
            let changes = propagate(&mut tree, origin);
            persist(tx, &tree, &changes)?;
            Ok(link)
        })?;
        info!(origin = %link.origin, dest = %link.dest, "linked nodes");
        Ok(link)
    }

    /// Remove the `origin -> dest` edge. A date origin left without children
    /// is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if either node or the edge is missing.
    pub fn unlink(&mut self, origin: &Selector, dest: &Selector) -> Result<()> {
        let (origin, dest) = self.write("unlink", |tx| {
            let origin = require(tx, origin)?;
            let dest = require(tx, dest)?;
            let mut tree = load(tx, origin.id)?;
            tree.remove_child(origin.id, dest.id)?;
            query::delete_link(tx, origin.id, dest.id)?;

            let changes = propagate(&mut tree, origin.id);
            persist(tx, &tree, &changes)?;
            prune_date_node(tx, &mut tree, origin.id)?;
            Ok((origin.id, dest.id))
        })?;
        info!(%origin, %dest, "unlinked nodes");
        Ok(())
    }

    /// Delete one node. Its children survive; those left without parents
    /// become roots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist.
    pub fn remove(&mut self, selector: &Selector) -> Result<Removal> {
        let removal = self.write("remove", |tx| {
            let target = require(tx, selector)?;
            let mut tree = load(tx, target.id)?;
            let (parents, orphaned) = match tree.node(target.id) {
                Some(node) => (
                    node.parents().map(|p| p.id()).collect::<Vec<_>>(),
                    node.children().map(|c| c.record().clone()).collect(),
                ),
                None => (Vec::new(), Vec::new()),
            };

            query::delete_node(tx, target.id)?;
            tree.remove_node(target.id);
            settle_parents(tx, &mut tree, &parents)?;
            Ok(Removal {
                removed: vec![target],
                orphaned,
            })
        })?;
        info!(
            removed = removal.removed.len(),
            orphaned = removal.orphaned.len(),
            "removed node"
        );
        Ok(removal)
    }

    /// Delete a node and every descendant that has no other parent.
    ///
    /// The walk descends through single-parent children only. A child with
    /// several parents is detached from the deleted parent and left in
    /// place, together with everything below it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist.
    pub fn remove_recursive(&mut self, selector: &Selector) -> Result<Removal> {
        let removal = self.write("remove_recursive", |tx| {
            let target = require(tx, selector)?;
            let mut tree = load(tx, target.id)?;
            let parents: Vec<NodeId> = tree
                .node(target.id)
                .map(|n| n.parents().map(|p| p.id()).collect())
                .unwrap_or_default();

            let mut removal = Removal {
                removed: vec![target.clone()],
                orphaned: Vec::new(),
            };
            let mut stack = vec![target.id];
            while let Some(id) = stack.pop() {
                let Some(node) = tree.node(id) else {
                    continue;
                };
                for child in node.children() {
                    if child.parents().count() > 1 {
                        removal.orphaned.push(child.record().clone());
                    } else {
                        removal.removed.push(child.record().clone());
                        stack.push(child.id());
                    }
                }
            }

            for record in &removal.removed {
                query::delete_node(tx, record.id)?;
                tree.remove_node(record.id);
            }
            settle_parents(tx, &mut tree, &parents)?;
            Ok(removal)
        })?;
        info!(
            removed = removal.removed.len(),
            detached = removal.orphaned.len(),
            "removed subtree"
        );
        Ok(removal)
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Mark a node and its whole subtree completed now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist.
    pub fn check(&mut self, selector: &Selector) -> Result<Vec<CompletionChange>> {
        self.check_at(selector, now())
    }

    /// [`Self::check`] with an explicit completion time (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist.
    pub fn check_at(&mut self, selector: &Selector, at: i64) -> Result<Vec<CompletionChange>> {
        self.set_completion("check", selector, Some(at))
    }

    /// Clear completion on a node and its whole subtree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the node does not exist.
    pub fn uncheck(&mut self, selector: &Selector) -> Result<Vec<CompletionChange>> {
        self.set_completion("uncheck", selector, None)
    }

    fn set_completion(
        &mut self,
        op: &'static str,
        selector: &Selector,
        value: Option<i64>,
    ) -> Result<Vec<CompletionChange>> {
        let (target, changes) = self.write(op, |tx| {
            let target = require(tx, selector)?;
            let mut tree = load(tx, target.id)?;
            let mut changes = force_completion(&mut tree, target.id, value);
            changes.extend(propagate(&mut tree, target.id));
            Ok((target.id, persist(tx, &tree, &changes)?))
        })?;
        info!(op, id = %target, changed = changes.len(), "updated completion");
        Ok(changes)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Resolve a selector to a stored node or an unpersisted date.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown ids and aliases.
    pub fn resolve(&mut self, selector: &Selector) -> Result<Resolution> {
        self.read(|tx| resolve_in(tx, selector))
    }

    /// Load the component around a node. An unpersisted date resolves to a
    /// lone synthetic node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown ids and aliases.
    pub fn load(&mut self, selector: &Selector) -> Result<Loaded> {
        self.read(|tx| match resolve_in(tx, selector)? {
            Resolution::Found(id) => Ok(Loaded {
                tree: load(tx, id)?,
                focus: id,
            }),
            Resolution::UnpersistedDate(name) => Ok(Loaded {
                tree: Multitree::synthetic_date(&name, now()),
                focus: NodeId::SYNTHETIC,
            }),
        })
    }

    /// Every root that is not a date node, each with its component.
    ///
    /// # Errors
    ///
    /// Returns a storage error if loading fails.
    pub fn roots(&mut self) -> Result<Vec<Loaded>> {
        self.read(|tx| {
            query::get_roots(tx)?
                .into_iter()
                .filter(|r| !r.is_date_node())
                .map(|r| Ok(Loaded { tree: load(tx, r.id)?, focus: r.id }))
                .collect()
        })
    }

    /// Every date node, oldest date first, each with its component.
    ///
    /// # Errors
    ///
    /// Returns a storage error if loading fails.
    pub fn date_nodes(&mut self) -> Result<Vec<Loaded>> {
        self.read(|tx| {
            let mut dates: Vec<NodeRecord> = query::get_roots(tx)?
                .into_iter()
                .filter(NodeRecord::is_date_node)
                .collect();
            dates.sort_by(|a, b| a.name.cmp(&b.name));
            dates
                .into_iter()
                .map(|r| Ok(Loaded { tree: load(tx, r.id)?, focus: r.id }))
                .collect()
        })
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    fn write<T, F>(&mut self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let result = transact(&mut self.conn, TransactionBehavior::Immediate, f);
        if let Err(err) = &result {
            if err.is_retryable() {
                warn!(op, error = %err, "write transaction conflicted");
            } else {
                debug!(op, error = %err, "write transaction rolled back");
            }
        }
        result
    }

    fn read<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        transact(&mut self.conn, TransactionBehavior::Deferred, f)
    }
}

fn transact<T, F>(conn: &mut Connection, behavior: TransactionBehavior, f: F) -> Result<T>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(behavior)?;
    let out = f(&tx)?;
    tx.commit()?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// In-transaction helpers
// ---------------------------------------------------------------------------

fn resolve_in(conn: &Connection, selector: &Selector) -> Result<Resolution> {
    let found = match selector {
        Selector::ById(id) => query::get_node(conn, *id)?,
        Selector::ByAlias(alias) => query::get_node_by_alias(conn, alias)?,
        Selector::ByName(name) => {
            return Ok(query::get_node_by_name(conn, name)?.map_or_else(
                || Resolution::UnpersistedDate(name.clone()),
                |record| Resolution::Found(record.id),
            ));
        }
    };
    found
        .map(|record| Resolution::Found(record.id))
        .ok_or_else(|| Error::NotFound(format!("no node matches '{selector}'")))
}

/// The stored node for `selector`; an unpersisted date is not found.
fn require(conn: &Connection, selector: &Selector) -> Result<NodeRecord> {
    let missing = || Error::NotFound(format!("no node matches '{selector}'"));
    match resolve_in(conn, selector)? {
        Resolution::Found(id) => query::get_node(conn, id)?.ok_or_else(missing),
        Resolution::UnpersistedDate(_) => Err(missing()),
    }
}

/// The stored node for `selector`, creating an unpersisted date node.
fn ensure(conn: &Connection, selector: &Selector) -> Result<NodeRecord> {
    match resolve_in(conn, selector)? {
        Resolution::Found(id) => query::get_node(conn, id)?
            .ok_or_else(|| Error::NotFound(format!("no node matches '{selector}'"))),
        Resolution::UnpersistedDate(name) => {
            let record = query::insert_node(conn, &name, now())?;
            debug!(id = %record.id, name, "created date node");
            Ok(record)
        }
    }
}

fn load(conn: &Connection, id: NodeId) -> Result<Multitree> {
    loader::load_component(conn, id)?.ok_or_else(|| Error::NotFound(format!("node {id}")))
}

/// Write the final in-memory completion of every changed node, once each.
fn persist(
    conn: &Connection,
    tree: &Multitree,
    changes: &[CompletionChange],
) -> Result<Vec<CompletionChange>> {
    let mut seen = HashSet::new();
    let mut written = Vec::new();
    for change in changes {
        if !seen.insert(change.id) {
            continue;
        }
        let Some(node) = tree.node(change.id) else {
            continue;
        };
        let completed_at = node.completed_at();
        query::set_completed(conn, change.id, completed_at)?;
        written.push(CompletionChange {
            id: change.id,
            completed_at,
        });
    }
    Ok(written)
}

/// Delete `id` if it is a date node without children. Returns whether it
/// was deleted.
fn prune_date_node(conn: &Connection, tree: &mut Multitree, id: NodeId) -> Result<bool> {
    let empty_date = tree
        .node(id)
        .is_some_and(|n| n.is_date_node() && n.is_leaf());
    if !empty_date {
        return Ok(false);
    }
    query::delete_node(conn, id)?;
    tree.remove_node(id);
    debug!(%id, "deleted empty date node");
    Ok(true)
}

/// After children were removed from `parents`: drop emptied date nodes and
/// re-propagate the rest.
fn settle_parents(conn: &Connection, tree: &mut Multitree, parents: &[NodeId]) -> Result<()> {
    let mut changes = Vec::new();
    for &parent in parents {
        if !prune_date_node(conn, tree, parent)? {
            changes.extend(propagate(tree, parent));
        }
    }
    persist(conn, tree, &changes)?;
    Ok(())
}
