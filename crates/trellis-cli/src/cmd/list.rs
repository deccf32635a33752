//! `trellis ls` and `trellis lsd`: one line per node.

use std::io::Write;

use clap::Args;
use trellis_core::{Loaded, Trellis};

use crate::cmd::selector;
use crate::output::{OutputMode, render};
use crate::render::{NodeView, node_line};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// List this node's children instead of the roots.
    pub node: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListDatesArgs {}

fn print_lines(output: OutputMode, views: &[NodeView], lines: &[String]) -> anyhow::Result<()> {
    render(output, &views, |_, w| {
        for line in lines {
            writeln!(w, "{line}")?;
        }
        Ok(())
    })
}

/// Render each loaded focus node.
fn print_focused(output: OutputMode, loaded: &[Loaded]) -> anyhow::Result<()> {
    let focused: Vec<_> = loaded.iter().filter_map(Loaded::focus).collect();
    let views: Vec<NodeView> = focused.iter().copied().map(NodeView::from).collect();
    let lines: Vec<String> = focused.iter().copied().map(node_line).collect();
    print_lines(output, &views, &lines)
}

pub fn run_list(args: &ListArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    let Some(raw) = args.node.as_deref() else {
        return print_focused(output, &trellis.roots()?);
    };
    let loaded = trellis.load(&selector(raw)?)?;
    let children: Vec<_> = loaded
        .focus()
        .map(|node| node.children().collect())
        .unwrap_or_default();
    let views: Vec<NodeView> = children.iter().copied().map(NodeView::from).collect();
    let lines: Vec<String> = children.iter().copied().map(node_line).collect();
    print_lines(output, &views, &lines)
}

pub fn run_list_dates(
    _args: &ListDatesArgs,
    trellis: &mut Trellis,
    output: OutputMode,
) -> anyhow::Result<()> {
    print_focused(output, &trellis.date_nodes()?)
}
