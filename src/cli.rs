use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "batchsplit")]
#[command(about = "Split a directory tree into size-bounded batches with per-batch manifests")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show the batch plan without renaming or copying anything
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pack the input tree into size-bounded batch folders
    Split(SplitArgs),

    /// Initialize a batchsplit.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Flags for `split`. Every flag overrides the matching config key.
#[derive(Args, Debug, Default)]
pub struct SplitArgs {
    /// Directory tree to split (INPUT_DIR)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory receiving batch_NN folders (BATCH_DIR)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Batch limit in bytes (BATCH_SIZE)
    #[arg(short = 's', long)]
    pub batch_size: Option<u64>,

    /// Rename input entries to generated names before packing (RENAME_INPUT_FILES)
    #[arg(long)]
    pub rename: bool,

    /// Comma-separated extension allow-list, `*` for all (ALLOWED_EXTENSIONS)
    #[arg(short, long)]
    pub extensions: Option<String>,

    /// Skip writing batch_manifest.json (WRITE_MANIFEST=false)
    #[arg(long)]
    pub no_manifest: bool,

    /// Stop at the first failed copy (ON_COPY_ERROR=abort)
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
