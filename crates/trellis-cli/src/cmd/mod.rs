pub mod add;
pub mod alias;
pub mod check;
pub mod completions;
pub mod import;
pub mod link;
pub mod list;
pub mod remove;
pub mod rename;
pub mod stat;
pub mod tree;

use std::fmt;

use trellis_core::Selector;

use crate::output::{CliError, OutputMode, render_error};

/// Failures already printed to stderr; only the exit status is left to set.
#[derive(Debug)]
pub struct Reported {
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} operations failed", self.failed, self.total)
    }
}

impl std::error::Error for Reported {}

/// Parse a selector argument.
pub fn selector(raw: &str) -> anyhow::Result<Selector> {
    Ok(Selector::parse(raw)?)
}

/// The parent for new nodes: an explicit selector, or today's date node.
pub fn parent_or_today(raw: Option<&str>) -> anyhow::Result<Selector> {
    raw.map_or_else(|| Ok(Selector::today()), selector)
}

/// Results of running one operation per argument.
#[derive(Debug)]
pub struct Batch<T> {
    pub done: Vec<T>,
    failed: usize,
    total: usize,
}

impl<T> Batch<T> {
    /// `Err(Reported)` if any item failed.
    pub fn finish(self) -> anyhow::Result<()> {
        if self.failed > 0 {
            return Err(Reported {
                failed: self.failed,
                total: self.total,
            }
            .into());
        }
        Ok(())
    }
}

/// Run `op` for every item, reporting failures to stderr without stopping.
pub fn each<I, T, F>(output: OutputMode, items: I, mut op: F) -> anyhow::Result<Batch<T>>
where
    I: IntoIterator,
    I::Item: fmt::Display,
    F: FnMut(&I::Item) -> anyhow::Result<T>,
{
    let mut batch = Batch {
        done: Vec::new(),
        failed: 0,
        total: 0,
    };
    for item in items {
        batch.total += 1;
        match op(&item) {
            Ok(value) => batch.done.push(value),
            Err(err) => {
                batch.failed += 1;
                tracing::debug!(%item, error = %err, "operation failed");
                render_error(output, &CliError::from(&err).context(&item))?;
            }
        }
    }
    Ok(batch)
}
