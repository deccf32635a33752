use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use super::name::is_date_name;

/// Storage identity of a node.
///
/// Row ids start at 1, so `0` is free to mark a date node that has been
/// resolved by name but not written yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl NodeId {
    /// Identity of an unpersisted date node.
    pub const SYNTHETIC: Self = Self(0);

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        self.0 == Self::SYNTHETIC.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql for NodeId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for NodeId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

/// One row of the `nodes` table.
///
/// Timestamps are Unix seconds (UTC). `completed_at` is the only persisted
/// completion state; in-progress and inactive are derived from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub alias: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl NodeRecord {
    /// A fresh record that has not been completed.
    pub fn new(id: NodeId, name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id,
            name: name.into(),
            alias: None,
            created_at,
            completed_at: None,
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Whether the node is named after a calendar date.
    #[must_use]
    pub fn is_date_node(&self) -> bool {
        is_date_name(&self.name)
    }
}

/// A directed parent -> child edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Link {
    pub id: i64,
    pub origin: NodeId,
    pub dest: NodeId,
}
