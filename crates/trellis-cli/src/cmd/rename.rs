//! `trellis rename`: change a node's name.

use std::io::Write;

use clap::Args;
use trellis_core::Trellis;

use crate::cmd::selector;
use crate::output::{OutputMode, render};
use crate::render::record_line;

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Node to rename.
    pub node: String,

    /// Words joined with spaces to form the new name.
    #[arg(required = true, value_name = "NAME")]
    pub name: Vec<String>,
}

pub fn run_rename(args: &RenameArgs, trellis: &mut Trellis, output: OutputMode) -> anyhow::Result<()> {
    let record = trellis.rename(&selector(&args.node)?, &args.name.join(" "))?;
    render(output, &record, |r, w| writeln!(w, "{}", record_line(r)))
}
