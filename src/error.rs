//! Error taxonomy for a batch split run.
//!
//! Fatal conditions (`SplitError`) stop the run and carry a `help` hint telling
//! the caller what to fix. Per-entry I/O failures (`EntryError`) are recorded
//! against the offending path and the run carries on.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Invalid or unreadable configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError
{
    #[error("BATCH_SIZE is not set")]
    #[diagnostic(
        code(batchsplit::config::missing_batch_size),
        help("set BATCH_SIZE to the batch limit in bytes (environment, .env, batchsplit.toml or --batch-size)")
    )]
    MissingBatchSize,

    #[error("BATCH_SIZE must be a positive integer byte count, got `{value}`")]
    #[diagnostic(
        code(batchsplit::config::invalid_batch_size),
        help("use a plain byte count such as 1073741824")
    )]
    InvalidBatchSize
    {
        value: String
    },

    #[error("ALLOWED_EXTENSIONS does not name any extension: `{value}`")]
    #[diagnostic(
        code(batchsplit::config::empty_extensions),
        help("use a comma-separated list such as `jpg,png,mp4`, or `*` for all files")
    )]
    EmptyExtensions
    {
        value: String
    },

    #[error("ON_COPY_ERROR must be `continue` or `abort`, got `{value}`")]
    #[diagnostic(code(batchsplit::config::invalid_copy_policy))]
    InvalidCopyPolicy
    {
        value: String
    },

    #[error("cannot expand path `{value}`")]
    #[diagnostic(
        code(batchsplit::config::invalid_path),
        help("check that every $VARIABLE used in INPUT_DIR / BATCH_DIR is set")
    )]
    InvalidPath
    {
        value: String,
        #[source]
        source: shellexpand::LookupError<std::env::VarError>,
    },

    #[error("failed to read {}", .path.display())]
    #[diagnostic(code(batchsplit::config::dotenv))]
    DotEnv
    {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("failed to load configuration")]
    #[diagnostic(code(batchsplit::config::load))]
    Load(#[from] config::ConfigError),
}

/// Filesystem operation that failed for a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOp
{
    ReadDir,
    Stat,
    Rename,
    CreateDir,
    Copy,
    WriteManifest,
}

impl fmt::Display for EntryOp
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        let verb = match self
        {
            EntryOp::ReadDir => "read directory",
            EntryOp::Stat => "stat",
            EntryOp::Rename => "rename",
            EntryOp::CreateDir => "create directory",
            EntryOp::Copy => "copy",
            EntryOp::WriteManifest => "write manifest",
        };
        f.write_str(verb)
    }
}

/// A recoverable I/O failure tied to one path.
#[derive(Debug, Error)]
#[error("could not {op} `{}`: {source}", .path.display())]
pub struct EntryError
{
    pub path: PathBuf,
    pub op: EntryOp,
    pub source: io::Error,
}

impl EntryError
{
    pub fn new(
        path: &Path,
        op: EntryOp,
        source: io::Error,
    ) -> Self
    {
        Self {
            path: path.to_path_buf(),
            op,
            source,
        }
    }
}

/// Conditions that end a run.
#[derive(Debug, Error, Diagnostic)]
pub enum SplitError
{
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("input directory `{}` does not exist", .path.display())]
    #[diagnostic(
        code(batchsplit::input_not_found),
        help("create the input directory or point --input / INPUT_DIR at an existing one")
    )]
    InputNotFound
    {
        path: PathBuf
    },

    #[error("no valid files found in input directory `{}`", .path.display())]
    #[diagnostic(
        code(batchsplit::empty_input),
        help("add some files to process, or widen ALLOWED_EXTENSIONS")
    )]
    EmptyInput
    {
        path: PathBuf
    },

    #[error("found existing files in batch directory `{}`:\n{}", .path.display(), list_entries(.entries))]
    #[diagnostic(
        code(batchsplit::output_not_empty),
        help("manually delete all files and folders in the batch directory before proceeding")
    )]
    OutputNotEmpty
    {
        path: PathBuf,
        entries: Vec<String>,
    },

    #[error("cannot prepare batch directory `{}`", .path.display())]
    #[diagnostic(code(batchsplit::output_io))]
    OutputIo
    {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("aborting after a failed copy")]
    #[diagnostic(
        code(batchsplit::copy_aborted),
        help("fix the failing file, or set ON_COPY_ERROR=continue to skip it")
    )]
    CopyAborted(#[source] EntryError),
}

fn list_entries(entries: &[String]) -> String
{
    entries
        .iter()
        .map(|e| format!("- {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn entry_error_names_path_and_cause()
    {
        let err = EntryError::new(
            Path::new("in/a.txt"),
            EntryOp::Copy,
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("copy"));
        assert!(msg.contains("in/a.txt"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn output_not_empty_lists_entries()
    {
        let err = SplitError::OutputNotEmpty {
            path: PathBuf::from("batches"),
            entries: vec!["old/".into(), "notes.txt".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("- old/"));
        assert!(msg.contains("- notes.txt"));
    }
}
