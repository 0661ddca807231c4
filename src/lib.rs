//! **batchsplit** - Split a directory tree into size-bounded batches
//!
//! Walks an input tree, optionally renames entries into a normalized scheme,
//! greedily packs files into `batch_NN/<group>_NN/` folders under a byte limit
//! and writes a JSON manifest per batch.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Error taxonomy: fatal run errors and per-entry I/O failures
pub mod error;

/// Core pipeline - naming, packing, manifests and the split run
pub mod core {
    /// Normalized, length-bounded display names
    pub mod naming;
    pub use naming::generate_name;

    /// Greedy batch planning and the copy executor
    pub mod packer;
    pub use packer::{BatchPlan, CopyPolicy, PlannedCopy, plan};

    /// Per-batch JSON manifest
    pub mod manifest;
    pub use manifest::{BatchManifest, write_manifest};

    /// The `split` command
    pub mod split;
    pub use split::{SplitReport, run as split_run, split_tree};

    /// Dry-run plan rendering with ptree
    pub mod tree;
}

/// Infrastructure - configuration, filters, scanning and utilities
pub mod infra {
    /// Layered configuration (file, .env, environment, flags)
    pub mod config;
    pub use self::config::{Config, Settings, init as config_init, load_config};

    /// Ignore rules and the extension allow-list
    pub mod filters;
    pub use filters::{ExtensionFilter, IgnoreRules};

    /// Recursive tree scanner with in-place renaming
    pub mod walk;
    pub use walk::{FileDescriptor, RenameMode, TreeScanner};

    /// Formatting helpers
    pub mod utils;
}

// Re-exports for the CLI and integration tests
pub use cli::{AppContext, Cli, Commands};
pub use self::core::{split_run, split_tree};
pub use error::{ConfigError, EntryError, SplitError};
pub use infra::{Config, Settings, TreeScanner, load_config};
