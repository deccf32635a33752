//! `trellis import`: create trees from a tab-indented outline.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use trellis_core::{Selector, Trellis, parse_outline};

use crate::cmd::parent_or_today;
use crate::output::{OutputMode, render};
use crate::render::{TreeView, write_tree};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Parent for the imported trees; defaults to today's date node.
    #[arg(short, long, value_name = "NODE", conflicts_with = "root")]
    pub parent: Option<String>,

    /// Import the trees as new roots.
    #[arg(short, long)]
    pub root: bool,

    /// Outline file; reads stdin when omitted.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Imported {
    trees: Vec<TreeView>,
    nodes: usize,
}

fn open_input(file: Option<&PathBuf>) -> anyhow::Result<Box<dyn BufRead>> {
    Ok(match file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    })
}

pub fn run_import(args: &ImportArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    let skeletons = parse_outline(open_input(args.file.as_ref())?)?;
    let parent = if args.root {
        None
    } else {
        Some(parent_or_today(args.parent.as_deref())?)
    };
    let roots = trellis.add_tree(&skeletons, parent.as_ref())?;

    let mut loaded = Vec::with_capacity(roots.len());
    for id in roots {
        loaded.push(trellis.load(&Selector::ById(id))?);
    }
    let focused: Vec<_> = loaded.iter().filter_map(trellis_core::Loaded::focus).collect();
    let imported = Imported {
        trees: focused.iter().copied().map(TreeView::from).collect(),
        nodes: skeletons.iter().map(trellis_core::Skeleton::size).sum(),
    };

    render(output, &imported, |imported, w| {
        for &node in &focused {
            write_tree(w, node)?;
        }
        writeln!(
            w,
            "Imported {} trees ({} nodes)",
            imported.trees.len(),
            imported.nodes
        )
    })
}
