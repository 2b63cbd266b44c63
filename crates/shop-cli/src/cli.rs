use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shopctl",
    about = "Storefront ledger: catalog, purchases and audit trail",
    version,
)]
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
    /// Execute a JSON script of steps against a fresh in-memory storefront
    Run(RunArgs),
    /// Run the reference purchase scenarios
    Demo,
    /// Execute a script, then print the event log and verify it
    Audit(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to the JSON script
    pub script: PathBuf,
    /// TOML file with the storefront configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Label of the proprietor when no config file is given
    #[arg(long, default_value = "owner")]
    pub owner: String,
}
