//! Plain data types shared by storage, the in-memory multitree and callers.

pub mod name;
pub mod node;
pub mod selector;

pub use name::{DATE_FORMAT, MAX_NAME_LEN, date_name, is_date_name, validate_alias, validate_name};
pub use node::{Link, NodeId, NodeRecord};
pub use selector::{Resolution, Selector};
