use std::path::PathBuf;

use aip_bag::ArchiveFormat;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "aip",
    about = "Inspect and check archival package replicas",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Replication settings file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the properties, tags, metadata and payloads of a package
    Inspect(InspectArgs),
    /// Recompute every digest in a package
    Verify(VerifyArgs),
    /// Print the replica store key for a handle
    Ref(RefArgs),
    /// Check whether a replica is present in a local store
    Exists(ExistsArgs),
    /// Validate a settings file and list its restore profiles
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    pub archive: PathBuf,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub archive: PathBuf,
}

#[derive(Args)]
pub struct RefArgs {
    pub handle: String,
    /// Archive format; defaults to the configured one.
    #[arg(long, value_parser = parse_format)]
    pub archive_format: Option<ArchiveFormat>,
}

#[derive(Args)]
pub struct ExistsArgs {
    pub handle: String,
    /// Root directory of the local replica store.
    #[arg(long)]
    pub store: PathBuf,
    /// Store group; defaults to the configured one.
    #[arg(long)]
    pub group: Option<String>,
    #[arg(long, value_parser = parse_format)]
    pub archive_format: Option<ArchiveFormat>,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub path: PathBuf,
}

fn parse_format(s: &str) -> Result<ArchiveFormat, String> {
    s.parse().map_err(|e: aip_bag::BagError| e.to_string())
}
