use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pcmkctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative constraint and property management for Pacemaker clusters", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the settings file
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Settings file (default: config.toml or config.json in the config dir)
    #[arg(long, global = true, env = "PCMKCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read the CIB from a file instead of the live cluster
    #[arg(long, global = true)]
    pub cib_file: Option<PathBuf>,

    /// Log cluster changes instead of making them
    #[arg(long, global = true)]
    pub debug: bool,

    /// Attempts of every retried operation
    #[arg(long, global = true)]
    pub retry_count: Option<u32>,

    /// Seconds between attempts
    #[arg(long, global = true)]
    pub retry_step: Option<u64>,

    /// Deadline of one attempt, in seconds
    #[arg(long, global = true)]
    pub retry_timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show primitive state per node and selected cluster properties
    Status {
        /// Label of the report block
        #[arg(long)]
        tag: Option<String>,
    },

    /// List constraints and properties configured in the CIB
    List {
        #[arg(value_enum, default_value = "all")]
        target: ListTarget,
    },

    /// Preview what apply would change
    Diff(ManifestArgs),

    /// Make the cluster match a manifest
    Apply(ApplyArgs),

    /// Wait for the cluster or a primitive to converge
    Wait(WaitArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ListTarget {
    Orders,
    Colocations,
    Properties,
    All,
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Manifest of declared objects (.toml or .json)
    pub manifest: PathBuf,

    /// Only objects matching: type (orders, colocations, properties) or type.name
    #[arg(long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Show what would change without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct WaitArgs {
    #[command(subcommand)]
    pub condition: WaitCondition,

    /// Fail once the attempt budget is spent
    #[arg(long, global = true)]
    pub fail_on_timeout: bool,
}

#[derive(Subcommand, Clone)]
pub enum WaitCondition {
    /// Controller elected and node state available
    Online,
    /// Primitive has a known status
    Status(PrimitiveArgs),
    /// Primitive is running
    Start(PrimitiveArgs),
    /// Primitive is stopped
    Stop(PrimitiveArgs),
    /// Primitive runs as master
    Master(PrimitiveArgs),
}

#[derive(Args, Clone)]
pub struct PrimitiveArgs {
    /// Primitive id
    pub primitive: String,

    /// Only consider this node
    #[arg(long)]
    pub node: Option<String>,
}
