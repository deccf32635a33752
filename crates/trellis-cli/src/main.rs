#![forbid(unsafe_code)]

mod cmd;
mod output;
mod render;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use trellis_core::{Config, Trellis};

#[derive(Parser, Debug)]
#[command(
    name = "trellis",
    author,
    version,
    about = "trellis: a task organizer built on multitrees",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Database file (overrides TRELLIS_DB and config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Create",
        about = "Create a node",
        long_about = "Create a node under a parent (today's date node by default) or as a new root.",
        after_help = "EXAMPLES:\n    # Add a task for today\n    trellis add Buy milk\n\n    # Add under node 12\n    trellis add -p 12 Call the plumber\n\n    # Start a new root\n    trellis add -r Home renovation"
    )]
    Add(cmd::add::AddArgs),

    #[command(
        next_help_heading = "Create",
        about = "Import trees from a tab-indented outline",
        after_help = "EXAMPLES:\n    # Import under today's date node\n    trellis import plan.txt\n\n    # Import as new roots from stdin\n    cat plan.txt | trellis import -r"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Read",
        about = "Print the tree under a node",
        after_help = "EXAMPLES:\n    # Today's tree\n    trellis tree\n\n    # A specific node\n    trellis tree work"
    )]
    Tree(cmd::tree::TreeArgs),

    #[command(
        next_help_heading = "Read",
        visible_alias = "ls",
        about = "List roots, or the children of a node",
        after_help = "EXAMPLES:\n    # All roots\n    trellis ls\n\n    # Children of node 3\n    trellis ls 3"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        visible_alias = "lsd",
        about = "List date nodes",
        after_help = "EXAMPLES:\n    trellis lsd"
    )]
    ListDates(cmd::list::ListDatesArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a node's neighbourhood and details",
        after_help = "EXAMPLES:\n    trellis stat 12\n    trellis stat --json work"
    )]
    Stat(cmd::stat::StatArgs),

    #[command(
        next_help_heading = "Status",
        about = "Mark nodes completed",
        long_about = "Mark nodes and everything below them completed; ancestors follow.",
        after_help = "EXAMPLES:\n    trellis check 12 13"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        next_help_heading = "Status",
        about = "Reopen nodes",
        long_about = "Clear completion on nodes and everything below them; ancestors follow.",
        after_help = "EXAMPLES:\n    trellis uncheck 12"
    )]
    Uncheck(cmd::check::UncheckArgs),

    #[command(
        next_help_heading = "Structure",
        about = "Add edges from an origin to targets",
        long_about = "Place targets under an origin. Links that would create a cycle or a second path between two nodes are refused.",
        after_help = "EXAMPLES:\n    # Plan node 12 for today\n    trellis link 2024-05-01 12\n\n    # Share two tasks with a project\n    trellis link work 12 13"
    )]
    Link(cmd::link::LinkArgs),

    #[command(
        next_help_heading = "Structure",
        about = "Remove the edge between two nodes",
        after_help = "EXAMPLES:\n    trellis unlink work 12"
    )]
    Unlink(cmd::link::UnlinkArgs),

    #[command(
        next_help_heading = "Structure",
        visible_alias = "rm",
        about = "Delete nodes",
        long_about = "Delete nodes. Children survive as roots unless --recursive is given, which also deletes descendants that have no other parent.",
        after_help = "EXAMPLES:\n    trellis rm 12\n    trellis rm -rv work"
    )]
    Remove(cmd::remove::RemoveArgs),

    #[command(
        next_help_heading = "Attributes",
        about = "Rename a node",
        after_help = "EXAMPLES:\n    trellis rename 12 Call the electrician"
    )]
    Rename(cmd::rename::RenameArgs),

    #[command(
        next_help_heading = "Attributes",
        about = "Give a node an alias",
        after_help = "EXAMPLES:\n    trellis alias 3 work\n    trellis tree work"
    )]
    Alias(cmd::alias::AliasArgs),

    #[command(
        next_help_heading = "Attributes",
        about = "Drop a node's alias",
        after_help = "EXAMPLES:\n    trellis unalias work"
    )]
    Unalias(cmd::alias::UnaliasArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    trellis completions bash\n    trellis completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TRELLIS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "trellis=debug,info"
        } else {
            "trellis=info,warn"
        })
    });

    let format = env::var("TRELLIS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn open(db: Option<PathBuf>) -> anyhow::Result<Trellis> {
    let mut config = Config::load()?;
    if let Some(path) = db {
        config = config.with_database(path);
    }
    let trellis = Trellis::open(config)?;
    debug!(database = %trellis.config().database.display(), "opened database");
    Ok(trellis)
}

fn run(cli: Cli, output: OutputMode) -> anyhow::Result<()> {
    let command = match cli.command {
        Some(Commands::Completions(args)) => {
            let mut command = Cli::command();
            return cmd::completions::run_completions(args.shell, &mut command);
        }
        Some(command) => command,
        None => Commands::Tree(cmd::tree::TreeArgs::default()),
    };

    let trellis = &mut open(cli.db)?;
    match command {
        Commands::Add(args) => cmd::add::run_add(&args, trellis, output),
        Commands::Import(args) => cmd::import::run_import(&args, trellis, output),
        Commands::Tree(args) => cmd::tree::run_tree(&args, trellis, output),
        Commands::List(args) => cmd::list::run_list(&args, trellis, output),
        Commands::ListDates(args) => cmd::list::run_list_dates(&args, trellis, output),
        Commands::Stat(args) => cmd::stat::run_stat(&args, trellis, output),
        Commands::Check(args) => cmd::check::run_check(&args, trellis, output),
        Commands::Uncheck(args) => cmd::check::run_uncheck(&args, trellis, output),
        Commands::Link(args) => cmd::link::run_link(&args, trellis, output),
        Commands::Unlink(args) => cmd::link::run_unlink(&args, trellis, output),
        Commands::Remove(args) => cmd::remove::run_remove(&args, trellis, output),
        Commands::Rename(args) => cmd::rename::run_rename(&args, trellis, output),
        Commands::Alias(args) => cmd::alias::run_alias(&args, trellis, output),
        Commands::Unalias(args) => cmd::alias::run_unalias(&args, trellis, output),
        Commands::Completions(_) => Ok(()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = cli.output_mode();

    if let Err(err) = run(cli, output) {
        if err.downcast_ref::<cmd::Reported>().is_none() {
            output::render_error(output, &CliError::from(&err))?;
        }
        std::process::exit(1);
    }
    Ok(())
}
