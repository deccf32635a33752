//! `trellis tree`: print the subtree under a node.

use clap::Args;
use trellis_core::Trellis;

use crate::cmd::parent_or_today;
use crate::output::{OutputMode, render};
use crate::render::{TreeView, write_tree};

#[derive(Args, Debug, Default)]
pub struct TreeArgs {
    /// Node to print; defaults to today's date node.
    pub node: Option<String>,
}

pub fn run_tree(args: &TreeArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    let loaded = trellis.load(&parent_or_today(args.node.as_deref())?)?;
    let Some(focus) = loaded.focus() else {
        anyhow::bail!("node {} vanished from its own component", loaded.focus);
    };
    render(output, &TreeView::from(focus), |_, w| write_tree(w, focus))
}
