//! Core of the trellis task organizer.
//!
//! Tasks form a *multitree*: a DAG where a node may have several parents
//! but no two directed paths connect the same pair of nodes. Storage is a
//! flat SQLite edge list; each operation loads the connected component it
//! touches, validates and mutates it in memory, propagates completion
//! status, and writes the result back in a single transaction.
//!
//! ```no_run
//! use trellis_core::{Config, Selector, Trellis};
//!
//! # fn main() -> trellis_core::Result<()> {
//! let mut trellis = Trellis::open(Config::load()?)?;
//! let id = trellis.add_child("Buy milk", &Selector::today())?;
//! trellis.check(&Selector::ById(id))?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod import;
pub mod model;
pub mod multitree;

pub use config::Config;
pub use coordinator::{Loaded, Removal, Trellis};
pub use error::{Error, ErrorCode, Forbidden, Result};
pub use import::{Skeleton, parse_outline};
pub use model::{Link, NodeId, NodeRecord, Resolution, Selector};
pub use multitree::{CompletionChange, LinkViolation, Multitree, NodeRef, TaskStatus};
