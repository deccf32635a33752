use std::fmt;
use std::str::FromStr;

use chrono::Local;

use super::name::{date_name, is_date_name, validate_alias};
use super::node::NodeId;
use crate::error::{Error, Result};

/// A user-facing way of naming a node, parsed once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    ById(NodeId),
    /// Only date names can select by name.
    ByName(String),
    ByAlias(String),
}

impl Selector {
    /// Parse a raw argument.
    ///
    /// Positive integers select by id, `YYYY-MM-DD` selects a date node and
    /// anything else must be a valid alias.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSelector`] if the input fits none of the forms.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<i64>() {
            return if id > 0 {
                Ok(Self::ById(NodeId(id)))
            } else {
                Err(Error::InvalidSelector(format!(
                    "node ids are positive integers, got {id}"
                )))
            };
        }
        if is_date_name(raw) {
            return Ok(Self::ByName(raw.to_string()));
        }
        validate_alias(raw)
            .map(|()| Self::ByAlias(raw.to_string()))
            .map_err(|_| Error::InvalidSelector(format!("'{raw}' is not an id, date or alias")))
    }

    /// The date node for the local calendar day.
    #[must_use]
    pub fn today() -> Self {
        Self::ByName(date_name(Local::now().date_naive()))
    }
}

impl FromStr for Selector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById(id) => write!(f, "{id}"),
            Self::ByName(name) | Self::ByAlias(name) => f.write_str(name),
        }
    }
}

/// Outcome of looking a selector up inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(NodeId),
    /// A valid date name with no row yet.
    UnpersistedDate(String),
}
