//! `trellis stat`: neighbourhood and details of one node.

use std::io::Write;

use clap::Args;
use serde::Serialize;
use trellis_core::{NodeId, Trellis};

use crate::cmd::selector;
use crate::output::{OutputMode, pretty_kv, render};
use crate::render::{NodeView, format_time, neighbours};

#[derive(Args, Debug)]
pub struct StatArgs {
    /// Node to describe.
    pub node: String,
}

#[derive(Debug, Serialize)]
struct Stat {
    #[serde(flatten)]
    node: NodeView,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
    /// Completed leaves under the node, and all leaves under it.
    leaves_done: usize,
    leaves_total: usize,
    #[serde(skip)]
    diagram: Option<String>,
}

impl Stat {
    fn write(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if let Some(diagram) = &self.diagram {
            writeln!(w, "{diagram}")?;
        }
        let mut status = self.node.status.to_string();
        if self.leaves_total > 0 {
            status.push_str(&format!(" ({}/{})", self.leaves_done, self.leaves_total));
        }
        pretty_kv(w, "ID", self.node.id.to_string())?;
        pretty_kv(w, "Name", &self.node.name)?;
        pretty_kv(w, "Status", status)?;
        pretty_kv(w, "Parents", self.parents.len().to_string())?;
        pretty_kv(w, "Children", self.children.len().to_string())?;
        if let Some(alias) = &self.node.alias {
            pretty_kv(w, "Alias", alias)?;
        }
        pretty_kv(w, "Created", format_time(self.node.created_at))?;
        if let Some(at) = self.node.completed_at {
            pretty_kv(w, "Checked", format_time(at))?;
        }
        Ok(())
    }
}

pub fn run_stat(args: &StatArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    let loaded = trellis.load(&selector(&args.node)?)?;
    let Some(node) = loaded.focus() else {
        anyhow::bail!("node {} vanished from its own component", loaded.focus);
    };

    let leaves = loaded.tree.leaves(node.id());
    let leaves_done = leaves
        .iter()
        .filter_map(|&id| loaded.tree.node(id))
        .filter(|leaf| leaf.completed_at().is_some())
        .count();
    let isolated = node.is_root() && node.is_leaf();
    let stat = Stat {
        node: NodeView::from(node),
        parents: node.parents().map(|p| p.id()).collect(),
        children: node.children().map(|c| c.id()).collect(),
        leaves_done,
        leaves_total: leaves.len(),
        diagram: (!isolated).then(|| neighbours(node)),
    };
    render(output, &stat, |s, w| s.write(w))
}
