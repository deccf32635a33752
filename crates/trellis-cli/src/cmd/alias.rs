//! `trellis alias` and `trellis unalias`.

use std::io::Write;

use clap::Args;
use trellis_core::Trellis;

use crate::cmd::selector;
use crate::output::{OutputMode, render};
use crate::render::record_line;

#[derive(Args, Debug)]
pub struct AliasArgs {
    /// Node to name.
    pub node: String,

    /// Letters, digits, `-` and `_`; not all digits, not a date.
    pub alias: String,
}

#[derive(Args, Debug)]
pub struct UnaliasArgs {
    /// Node whose alias to drop.
    pub node: String,
}

fn set(
    trellis: &mut Trellis,
    output: OutputMode,
    node: &str,
    alias: Option<&str>,
) -> anyhow::Result<()> {
    let record = trellis.set_alias(&selector(node)?, alias)?;
    render(output, &record, |r, w| writeln!(w, "{}", record_line(r)))
}

pub fn run_alias(args: &AliasArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    set(trellis, output, &args.node, Some(&args.alias))
}

pub fn run_unalias(
    args: &UnaliasArgs,
    trellis: &mut Trellis,
    output: OutputMode,
) -> anyhow::Result<()> {
    set(trellis, output, &args.node, None)
}
