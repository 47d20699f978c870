use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fset",
    about = "Inspect, query and edit field-set files",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with `[read]` and `[write]` option tables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip blank lines and accept a missing end marker
    #[arg(long, global = true)]
    pub tolerant: bool,

    /// Join repeated keys with `;` instead of rejecting them
    #[arg(long, global = true)]
    pub multiple: bool,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a record
    Show(ShowArgs),
    /// Print the value at a dotted key
    Get(GetArgs),
    /// List every fully qualified key
    Keys(KeysArgs),
    /// Set a value and rewrite the file
    Set(SetArgs),
    /// Remove a value or subset and rewrite the file
    Rm(RmArgs),
    /// Rewrite a file in sorted canonical order
    Fmt(FmtArgs),
    /// Merge an overlay record into a base record
    Merge(MergeArgs),
    /// Show a line diff of two records in canonical order
    Diff(DiffArgs),
    /// Parse every record file under a directory
    Check(CheckArgs),
}

#[derive(Args)]
pub struct ShowArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub sorted: bool,
}

#[derive(Args)]
pub struct GetArgs {
    pub file: PathBuf,
    pub key: String,
    /// Print each `;`-separated value on its own line
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct KeysArgs {
    pub file: PathBuf,
    #[arg(long, default_value = "")]
    pub prefix: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub file: PathBuf,
    pub key: String,
    pub value: String,
    #[arg(short, long)]
    pub append: bool,
}

#[derive(Args)]
pub struct RmArgs {
    pub file: PathBuf,
    pub key: String,
    #[arg(long)]
    pub subset: bool,
}

#[derive(Args)]
pub struct FmtArgs {
    pub file: PathBuf,
    /// Report whether the file is canonical without rewriting it
    #[arg(long)]
    pub check: bool,
}

#[derive(Args)]
pub struct MergeArgs {
    pub base: PathBuf,
    pub overlay: PathBuf,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DiffArgs {
    pub a: PathBuf,
    pub b: PathBuf,
}

#[derive(Args)]
pub struct CheckArgs {
    pub dir: PathBuf,
    /// File extensions to parse
    #[arg(long, value_delimiter = ',', default_value = "properties,fs")]
    pub ext: Vec<String>,
}
