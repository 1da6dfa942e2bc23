use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "relay", about = "Branch-addressed content server", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve the repositories under a root directory over HTTP
    Serve(ServeArgs),
    /// Create an empty repository
    Init(InitArgs),
    /// Print the head of every branch of every repository
    Heads(RootArgs),
    /// List the branches of one repository
    Branches(BranchesArgs),
    /// Show commit history of a branch
    Log(LogArgs),
    /// Print the effective server configuration
    Config(ConfigArgs),
}

/// Where repositories live. Shared by the read-only commands.
#[derive(Args, Clone, Debug)]
pub struct RootArgs {
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Name given to `--root` when it is itself a repository.
    #[arg(long, default_value = "default")]
    pub default_repo: String,
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<String>,
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args)]
pub struct InitArgs {
    pub path: PathBuf,
    /// Repository name; defaults to the directory name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, default_value = "main")]
    pub branch: String,
}

#[derive(Args)]
pub struct BranchesArgs {
    #[command(flatten)]
    pub root: RootArgs,
    #[arg(long)]
    pub repo: Option<String>,
}

#[derive(Args)]
pub struct LogArgs {
    #[command(flatten)]
    pub root: RootArgs,
    #[arg(long)]
    pub repo: Option<String>,
    #[arg(long, default_value = "main")]
    pub branch: String,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
