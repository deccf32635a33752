//! `trellis add`: create a node under a parent or as a new root.

use std::io::Write;

use clap::Args;
use serde::Serialize;
use trellis_core::{NodeId, Selector, Trellis};

use crate::cmd::parent_or_today;
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Parent node (id, alias or date); defaults to today's date node.
    #[arg(short, long, value_name = "NODE", conflicts_with = "root")]
    pub parent: Option<String>,

    /// Create a root node instead.
    #[arg(short, long)]
    pub root: bool,

    /// Words joined with spaces to form the name.
    #[arg(required = true, value_name = "NAME")]
    pub name: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Added {
    id: NodeId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<NodeId>,
}

pub fn run_add(args: &AddArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    let name = args.name.join(" ");
    let added = if args.root {
        Added {
            id: trellis.add_root(&name)?,
            name,
            parent: None,
        }
    } else {
        let parent = parent_or_today(args.parent.as_deref())?;
        let id = trellis.add_child(&name, &parent)?;
        // A fresh node has exactly the one parent it was created under.
        let loaded = trellis.load(&Selector::ById(id))?;
        let parent = loaded
            .focus()
            .and_then(|node| node.parents().next())
            .map(|p| p.id());
        Added { id, name, parent }
    };

    render(output, &added, |a, w| match a.parent {
        Some(parent) => writeln!(w, "({parent}) -> ({})", a.id),
        None => writeln!(w, "({})", a.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: AddArgs,
    }

    #[test]
    fn name_words_are_collected() {
        let w = Wrapper::parse_from(["test", "-p", "work", "Buy", "milk"]);
        assert_eq!(w.args.parent.as_deref(), Some("work"));
        assert_eq!(w.args.name.join(" "), "Buy milk");
        assert!(!w.args.root);
    }

    #[test]
    fn parent_and_root_conflict() {
        assert!(Wrapper::try_parse_from(["test", "-r", "-p", "1", "x"]).is_err());
    }

    #[test]
    fn name_is_required() {
        assert!(Wrapper::try_parse_from(["test", "-r"]).is_err());
    }

    #[test]
    fn add_under_explicit_parent() -> anyhow::Result<()> {
        let mut trellis = Trellis::open_in_memory()?;
        let root = trellis.add_root("project")?;
        let args = Wrapper::parse_from(["test", "-p", &root.to_string(), "step"]).args;
        run_add(&args, &mut trellis, OutputMode::Json)?;
        let loaded = trellis.load(&Selector::ById(root))?;
        assert_eq!(loaded.tree.len(), 2);
        Ok(())
    }
}
