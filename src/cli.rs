mod help_text;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Scan, draw, rebuild and diff directory trees
#[derive(Parser, Debug)]
#[command(name = "twig", version, about, long_about = help_text::ROOT_LONG_ABOUT)]
pub struct Cli {
    /// Increase log output (-v info, -vv debug). Takes precedence over RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Set the log level explicitly. Takes precedence over RUST_LOG.
    #[arg(
        long,
        value_name = "LEVEL",
        value_enum,
        global = true,
        conflicts_with = "verbose"
    )]
    pub log_level: Option<LogLevel>,

    /// Change to DIRECTORY before doing anything
    #[arg(short = 'C', value_name = "DIRECTORY", global = true)]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Draw a directory as a tree
    #[command(long_about = help_text::GENERATE_LONG_ABOUT)]
    Generate(GenerateArgs),

    /// Create files and directories from a drawn tree
    #[command(long_about = help_text::CREATE_LONG_ABOUT)]
    Create(CreateArgs),

    /// Compare two snapshots or directories
    #[command(long_about = help_text::COMPARE_LONG_ABOUT)]
    Compare {
        /// Snapshot file or directory for the old state
        #[arg(value_name = "LEFT")]
        left: PathBuf,

        /// Snapshot file or directory for the new state
        #[arg(value_name = "RIGHT")]
        right: PathBuf,

        /// Report a removed and an added file with the same content as a move
        #[arg(long)]
        detect_moves: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// File holding the tree, or - for stdin
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory the tree's root maps onto [default: ./<root name>]
    #[arg(value_name = "TARGET")]
    pub target: Option<PathBuf>,

    /// Show what would be created without creating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Leave existing entries alone and do not descend into existing directories
    #[arg(long, conflicts_with = "abort_on_conflict")]
    pub skip_existing: bool,

    /// Fail if the target or any entry in the tree already exists
    #[arg(long)]
    pub abort_on_conflict: bool,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory to draw
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Include hidden entries
    #[arg(short = 'a', long)]
    pub all: bool,

    /// List directories only
    #[arg(short = 'd', long)]
    pub dirs_only: bool,

    /// Descend at most N levels
    #[arg(short = 'L', long, value_name = "N")]
    pub depth: Option<usize>,

    /// Skip entries matching PATTERN (repeatable)
    #[arg(short = 'I', long, value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Do not skip .git, node_modules and the other built-in patterns
    #[arg(long)]
    pub no_default_ignores: bool,

    /// Show the SHA-256 of each file
    #[arg(long)]
    pub hash: bool,

    /// Print `<sha256>  <path>` lines instead of a tree
    #[arg(long, conflicts_with_all = ["json", "json_stream"])]
    pub flat_hashes: bool,

    /// Show file sizes
    #[arg(long)]
    pub size: bool,

    /// Show modification times
    #[arg(long)]
    pub date: bool,

    /// Do not mark directories with a trailing slash
    #[arg(long)]
    pub no_dir_slash: bool,

    /// Stop after N entries; the tree printed is partial
    #[arg(long, value_name = "N", default_value_t = 0, hide_default_value = true)]
    pub max_files: usize,

    /// Skip hashing files larger than BYTES
    #[arg(long, value_name = "BYTES", default_value_t = 0, hide_default_value = true)]
    pub max_hash_size: u64,

    /// Worker threads (0 uses every core, 1 scans sequentially)
    #[arg(short = 't', long, value_name = "N", default_value_t = 0)]
    pub threads: usize,

    /// Print directory and file counts
    #[arg(short = 's', long)]
    pub stats: bool,

    /// Print the tree as JSON
    #[arg(long, conflicts_with = "json_stream")]
    pub json: bool,

    /// Print one JSON object per line: begin, a node per entry, stats, end
    #[arg(long)]
    pub json_stream: bool,

    /// Also save a snapshot to FILE (TOML if it ends in .toml, JSON otherwise)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
