//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// koji-lineage - cached container build lineage
///
/// Resolves container image builds to their parents, tasks and NVRs,
/// caching every lookup between runs.
#[derive(Parser, Debug)]
#[command(name = "koji-lineage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "KOJI_LINEAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted caches
    #[arg(long, global = true, env = "KOJI_LINEAGE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// JSON export of build metadata to resolve against
    #[arg(short, long, global = true, env = "KOJI_LINEAGE_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a build id or NVR to its build id
    Resolve(BuildArgs),

    /// Show the build record of a build
    Build(BuildArgs),

    /// Show the parent build of a build
    Parent(BuildArgs),

    /// Show the NVR of a build
    Nvr(BuildArgs),

    /// Show the package name of a build
    Package(BuildArgs),

    /// Show a build joined with its parent and task pullspecs
    Record(RecordArgs),

    /// Show the result of a build task
    Task(TaskArgs),

    /// Walk parent pointers from one or more builds
    Tree(TreeArgs),

    /// List the container builds of a tag
    Tag(TagArgs),

    /// Inspect or clear the persisted caches
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// A single build reference
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Build id or NVR
    pub build: String,
}

/// Arguments for the record command
#[derive(Parser, Debug)]
pub struct RecordArgs {
    /// Build id or NVR
    pub build: String,

    /// Include the pullspecs published by the build task
    #[arg(short, long)]
    pub task_info: bool,
}

/// Arguments for the task command
#[derive(Parser, Debug)]
pub struct TaskArgs {
    /// Task id
    pub task_id: i64,

    /// Fail instead of printing an error-shaped result for failed tasks
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the tree command
#[derive(Parser, Debug)]
pub struct TreeArgs {
    /// Seed build ids or NVRs
    #[arg(required = true)]
    pub builds: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the tag command
#[derive(Parser, Debug)]
pub struct TagArgs {
    /// Tag name
    pub tag: String,

    /// Only the latest build of each package
    #[arg(long)]
    pub latest: bool,

    /// Include builds inherited from parent tags
    #[arg(long)]
    pub inherit: bool,

    /// Only builds whose task pullspecs mention this batch label
    #[arg(short, long)]
    pub batch: Option<String>,

    /// Every build of the tag as a full record, grouped by package
    #[arg(long, conflicts_with = "batch")]
    pub records: bool,

    /// Include task pullspecs in the records
    #[arg(short, long, requires = "records")]
    pub task_info: bool,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show entry counts of every persisted cache
    Stats {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
    /// Show the cache directory
    Path,
    /// Delete every persisted cache file
    Clear,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
