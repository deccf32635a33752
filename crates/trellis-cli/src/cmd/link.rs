//! `trellis link` and `trellis unlink`: add or remove parent/child edges.

use std::io::Write;

use clap::Args;
use serde::Serialize;
use trellis_core::{Link, Trellis};

use crate::cmd::{each, selector};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Parent end of the new edges.
    pub origin: String,

    /// Nodes to place under the origin.
    #[arg(required = true, value_name = "TARGET")]
    pub targets: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UnlinkArgs {
    /// Parent end of the edge.
    pub origin: String,

    /// Child end of the edge.
    pub target: String,
}

#[derive(Debug, Serialize)]
struct Unlinked<'a> {
    origin: &'a str,
    target: &'a str,
}

pub fn run_link(args: &LinkArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    let origin = selector(&args.origin)?;
    let batch = each(output, &args.targets, |target| -> anyhow::Result<Link> {
        Ok(trellis.link(&origin, &selector(target)?)?)
    })?;
    render(output, &batch.done, |links, w| {
        for link in links {
            writeln!(w, "({}) -> ({})", link.origin, link.dest)?;
        }
        Ok(())
    })?;
    batch.finish()
}

pub fn run_unlink(args: &UnlinkArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    trellis.unlink(&selector(&args.origin)?, &selector(&args.target)?)?;
    let unlinked = Unlinked {
        origin: &args.origin,
        target: &args.target,
    };
    render(output, &unlinked, |u, w| {
        writeln!(w, "({}) -/- ({})", u.origin, u.target)
    })
}
