//! Tab-indented outline importer.
//!
//! Each non-blank line is a node; its depth is the number of leading tabs.
//! A line becomes a child of the nearest line above it with a smaller
//! depth. The result is a forest of bare names with no identities, ready to
//! be attached through [`crate::Trellis::add_tree`].

use std::io::BufRead;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::validate_name;

/// A node to be created, with the nodes to create below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skeleton {
    pub name: String,
    pub children: Vec<Skeleton>,
}

impl Skeleton {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this skeleton, itself included.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Self::size).sum::<usize>()
    }

    /// Validate every name in the skeleton.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::InvalidName`] encountered.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        self.children.iter().try_for_each(Self::validate)
    }
}

/// Parse an outline into a forest.
///
/// # Errors
///
/// Returns [`Error::InvalidName`] naming the 1-based line of the first bad
/// name, or [`Error::Storage`] if reading fails.
pub fn parse_outline<R: BufRead>(reader: R) -> Result<Vec<Skeleton>> {
    let mut roots = Vec::new();
    // Open ancestors of the current line, with their depths.
    let mut open: Vec<(usize, Skeleton)> = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        let depth = line.chars().take_while(|&c| c == '\t').count();
        let name = line[depth..].trim();
        if name.is_empty() {
            continue;
        }
        validate_name(name).map_err(|err| match err {
            Error::InvalidName(reason) => {
                Error::InvalidName(format!("line {}: {reason}", number + 1))
            }
            other => other,
        })?;

        close_until(&mut open, &mut roots, depth);
        open.push((depth, Skeleton::leaf(name)));
    }
    close_until(&mut open, &mut roots, 0);
    Ok(roots)
}

/// Pop open nodes at `depth` or deeper, attaching each to its parent.
fn close_until(open: &mut Vec<(usize, Skeleton)>, roots: &mut Vec<Skeleton>, depth: usize) {
    while open.last().is_some_and(|(d, _)| *d >= depth) {
        let Some((_, done)) = open.pop() else {
            break;
        };
        match open.last_mut() {
            Some((_, parent)) => parent.children.push(done),
            None => roots.push(done),
        }
    }
}
