//! `trellis check` and `trellis uncheck`: set or clear completion on whole
//! subtrees.

use std::io::Write;

use clap::Args;
use serde::Serialize;
use trellis_core::{CompletionChange, Selector, Trellis};

use crate::cmd::{each, selector};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Nodes to mark completed, with everything below them.
    #[arg(required = true, value_name = "NODE")]
    pub nodes: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UncheckArgs {
    /// Nodes to reopen, with everything below them.
    #[arg(required = true, value_name = "NODE")]
    pub nodes: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Updated {
    node: String,
    changes: Vec<CompletionChange>,
}

fn changed_ids(changes: &[CompletionChange]) -> String {
    changes
        .iter()
        .map(|c| format!("({})", c.id))
        .collect::<Vec<_>>()
        .join(" ")
}

fn run(
    nodes: &[String],
    output: OutputMode,
    mut apply: impl FnMut(&Selector) -> trellis_core::Result<Vec<CompletionChange>>,
) -> anyhow::Result<()> {
    let batch = each(output, nodes, |raw| {
        let changes = apply(&selector(raw)?)?;
        Ok(Updated {
            node: (*raw).clone(),
            changes,
        })
    })?;
    render(output, &batch.done, |updated, w| {
        for u in updated {
            if !u.changes.is_empty() {
                writeln!(w, "{}: {}", u.node, changed_ids(&u.changes))?;
            }
        }
        Ok(())
    })?;
    batch.finish()
}

pub fn run_check(args: &CheckArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    run(&args.nodes, output, |sel| trellis.check(sel))
}

pub fn run_uncheck(
    args: &UncheckArgs,
    trellis: &mut Trellis,
    output: OutputMode,
) -> anyhow::Result<()> {
    run(&args.nodes, output, |sel| trellis.uncheck(sel))
}
