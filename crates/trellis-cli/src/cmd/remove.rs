//! `trellis rm`: delete nodes, optionally with their exclusive subtrees.

use std::io::Write;

use clap::Args;
use trellis_core::{Removal, Trellis};

use crate::cmd::{each, selector};
use crate::output::{OutputMode, render};
use crate::render::record_line;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Also delete descendants that have no other parent.
    #[arg(short, long)]
    pub recursive: bool,

    /// Print every removed and orphaned node.
    #[arg(short, long)]
    pub verbose: bool,

    /// Nodes to delete.
    #[arg(required = true, value_name = "NODE")]
    pub nodes: Vec<String>,
}

fn write_removals(removals: &[Removal], w: &mut dyn Write) -> std::io::Result<()> {
    for removal in removals {
        for record in &removal.removed {
            writeln!(w, "Removed: {}", record_line(record))?;
        }
        for record in &removal.orphaned {
            writeln!(w, "Orphaned: {}", record_line(record))?;
        }
    }
    Ok(())
}

pub fn run_remove(args: &RemoveArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    let batch = each(output, &args.nodes, |raw| {
        let sel = selector(raw)?;
        let removal = if args.recursive {
            trellis.remove_recursive(&sel)?
        } else {
            trellis.remove(&sel)?
        };
        Ok(removal)
    })?;
    render(output, &batch.done, |removals, w| {
        if args.verbose {
            write_removals(removals, w)?;
        }
        Ok(())
    })?;
    batch.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use trellis_core::Selector;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: RemoveArgs,
    }

    #[test]
    fn flags_parse() {
        let w = Wrapper::parse_from(["test", "-rv", "3", "4"]);
        assert!(w.args.recursive);
        assert!(w.args.verbose);
        assert_eq!(w.args.nodes, vec!["3", "4"]);
    }

    #[test]
    fn verbose_lines_name_removed_and_orphaned() -> anyhow::Result<()> {
        let mut trellis = Trellis::open_in_memory()?;
        let a = trellis.add_root("a")?;
        let b = trellis.add_child("b", &Selector::ById(a))?;
        let removal = trellis.remove(&Selector::ById(a))?;

        let mut buf = Vec::new();
        write_removals(&[removal], &mut buf)?;
        let text = String::from_utf8(buf)?;
        assert_eq!(
            text,
            format!("Removed: [ ] a ({a})\nOrphaned: [ ] b ({b})\n")
        );
        Ok(())
    }
}
