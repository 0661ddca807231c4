//! Filepath: src/core/split.rs
//! The `split` command: boundary checks, scan, plan, copy, verify, report.
//!
//! `split_tree` is the library entry point and returns typed `SplitError`s;
//! `run` wraps it for the CLI and prints the summary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled};
use tracing::{info, instrument};

use crate::cli::{AppContext, SplitArgs};
use crate::core::manifest::MANIFEST_FILE;
use crate::core::packer::{BatchPlan, CopyOptions, ExecutionReport, batch_dir_name, execute, plan};
use crate::core::tree::print_plan;
use crate::error::{EntryError, SplitError};
use crate::infra::config::{Settings, load_config};
use crate::infra::filters::IgnoreRules;
use crate::infra::utils::{SizeUtils, TextUtils};
use crate::infra::walk::{ExclusionCause, RenameMode, TreeScanner};

/// File and byte counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals
{
    pub files: usize,
    pub bytes: u64,
}

/// Scanned totals compared with what ended up under the batch directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification
{
    pub expected: Totals,
    pub found: Totals,
}

impl Verification
{
    pub fn is_consistent(&self) -> bool
    {
        self.expected == self.found
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct SplitReport
{
    pub input_dir: PathBuf,
    pub batch_dir: PathBuf,
    pub scanned: Totals,
    /// Entries left out by the ignore or extension filters
    pub skipped: usize,
    /// Per-entry failures during the scan (stat, rename, unreadable dirs)
    pub scan_failures: Vec<EntryError>,
    pub plans: Vec<BatchPlan>,
    /// `None` for a dry run
    pub execution: Option<ExecutionReport>,
    pub verification: Option<Verification>,
}

impl SplitReport
{
    /// Every per-entry failure, scan then copy.
    pub fn failures(&self) -> impl Iterator<Item = &EntryError>
    {
        self.scan_failures
            .iter()
            .chain(
                self.execution
                    .iter()
                    .flat_map(|e| e.failures.iter()),
            )
    }
}

/// Run a split with validated settings. With `dry_run` nothing on disk is
/// renamed, created or copied.
#[instrument(skip_all, fields(input = %settings.input_dir.display(), output = %settings.batch_dir.display()))]
pub fn split_tree(
    settings: &Settings,
    dry_run: bool,
    progress: &ProgressBar,
) -> Result<SplitReport, SplitError>
{
    if !settings
        .input_dir
        .is_dir()
    {
        return Err(SplitError::InputNotFound {
            path: settings
                .input_dir
                .clone(),
        });
    }

    // Checked before scanning so a refused run renames nothing
    ensure_output_empty(&settings.batch_dir, &settings.ignore)?;

    let mode = match (settings.rename, dry_run)
    {
        (false, _) => RenameMode::Keep,
        (true, true) => RenameMode::Preview,
        (true, false) => RenameMode::Apply,
    };
    let outcome = TreeScanner::new(
        settings
            .ignore
            .clone(),
        settings
            .extensions
            .clone(),
    )
    .with_rename(mode)
    .scan(&settings.input_dir);

    let scanned = Totals {
        files: outcome
            .files
            .len(),
        bytes: outcome.total_size(),
    };
    let skipped = outcome
        .filtered()
        .count();
    info!(files = scanned.files, bytes = scanned.bytes, skipped, "scan finished");

    if scanned.files == 0
    {
        return Err(SplitError::EmptyInput {
            path: settings
                .input_dir
                .clone(),
        });
    }

    let plans = plan(&outcome.files, settings.batch_size);
    info!(batches = plans.len(), "plan ready");

    let scan_failures: Vec<EntryError> = outcome
        .excluded
        .into_iter()
        .filter_map(|e| match e.cause
        {
            ExclusionCause::Failed(err) => Some(err),
            ExclusionCause::Filtered(_) => None,
        })
        .collect();

    let mut report = SplitReport {
        input_dir: settings
            .input_dir
            .clone(),
        batch_dir: settings
            .batch_dir
            .clone(),
        scanned,
        skipped,
        scan_failures,
        plans,
        execution: None,
        verification: None,
    };

    if dry_run
    {
        return Ok(report);
    }

    fs::create_dir_all(&settings.batch_dir).map_err(|source| SplitError::OutputIo {
        path: settings
            .batch_dir
            .clone(),
        source,
    })?;

    progress.set_length(scanned.files as u64);
    let options = CopyOptions {
        policy: settings.copy_policy,
        write_manifest: settings.write_manifest,
    };
    let execution = execute(&report.plans, &settings.batch_dir, &options, progress)?;
    progress.finish_and_clear();

    let found = tally(&settings.batch_dir, &settings.ignore, 0).map_err(|source| {
        SplitError::OutputIo {
            path: settings
                .batch_dir
                .clone(),
            source,
        }
    })?;
    report.verification = Some(Verification {
        expected: scanned,
        found,
    });
    report.execution = Some(execution);

    Ok(report)
}

/// Refuse to run when the batch directory holds visible entries. A missing
/// directory is fine.
fn ensure_output_empty(
    dir: &Path,
    ignore: &IgnoreRules,
) -> Result<(), SplitError>
{
    let io_err = |source: io::Error| SplitError::OutputIo {
        path: dir.to_path_buf(),
        source,
    };

    let reader = match fs::read_dir(dir)
    {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_err(e)),
    };

    let mut entries = Vec::new();
    for entry in reader
    {
        let entry = entry.map_err(io_err)?;
        let name = entry
            .file_name()
            .to_string_lossy()
            .into_owned();
        if !ignore.is_visible(&name)
        {
            continue;
        }
        let is_dir = entry
            .file_type()
            .map(|t| t.is_dir())
            .unwrap_or(false);
        entries.push(if is_dir { format!("{name}/") } else { name });
    }

    if entries.is_empty()
    {
        return Ok(());
    }
    entries.sort();
    Err(SplitError::OutputNotEmpty {
        path: dir.to_path_buf(),
        entries,
    })
}

/// Count files and bytes under the batch directory. Hidden and ignored
/// entries are skipped, as are the manifests at the top of each batch.
fn tally(
    dir: &Path,
    ignore: &IgnoreRules,
    depth: usize,
) -> io::Result<Totals>
{
    let mut totals = Totals::default();
    for entry in fs::read_dir(dir)?
    {
        let entry = entry?;
        let name = entry
            .file_name()
            .to_string_lossy()
            .into_owned();
        if !ignore.is_visible(&name) || (depth == 1 && name == MANIFEST_FILE)
        {
            continue;
        }

        let file_type = entry.file_type()?;
        if file_type.is_dir()
        {
            let sub = tally(&entry.path(), ignore, depth + 1)?;
            totals.files += sub.files;
            totals.bytes += sub.bytes;
        }
        else if file_type.is_file()
        {
            totals.files += 1;
            totals.bytes += entry
                .metadata()?
                .len();
        }
    }
    Ok(totals)
}

#[derive(Tabled)]
struct BatchRow
{
    #[tabled(rename = "Batch")]
    batch: String,
    #[tabled(rename = "Files")]
    files: usize,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Note")]
    note: String,
}

fn summary_table(report: &SplitReport) -> Table
{
    let rows: Vec<BatchRow> = match &report.execution
    {
        Some(execution) => execution
            .batches
            .iter()
            .map(|b| BatchRow {
                batch: batch_dir_name(b.index),
                files: b.file_count,
                size: SizeUtils::mib(b.total_size),
                note: if b.oversized { "oversized".to_string() } else { String::new() },
            })
            .collect(),
        None => report
            .plans
            .iter()
            .map(|p| BatchRow {
                batch: p.dir_name(),
                files: p
                    .entries
                    .len(),
                size: SizeUtils::mib(p.accumulated_size),
                note: if p.oversized { "oversized".to_string() } else { String::new() },
            })
            .collect(),
    };
    Table::new(rows)
}

/// `batchsplit split`
pub fn run(
    args: SplitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let mut cfg = load_config().map_err(SplitError::from)?;
    cfg.apply_overrides(&args);
    let settings = Settings::resolve(&cfg).map_err(SplitError::from)?;
    let color = !ctx.no_color;

    if !ctx.quiet
    {
        println!("Allowed extensions: {}", settings.extensions);
        if settings.rename
        {
            println!("Renaming input entries to generated names");
        }
    }

    let progress = if ctx.quiet || ctx.dry_run
    {
        ProgressBar::hidden()
    }
    else
    {
        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    };

    let report = split_tree(&settings, ctx.dry_run, &progress)?;

    if ctx.quiet
    {
        return Ok(());
    }

    if ctx.dry_run
    {
        let title = "DRY RUN: Would create:";
        if color
        {
            println!("{}", title.yellow());
        }
        else
        {
            println!("{title}");
        }
        print_plan(
            &report
                .batch_dir
                .display()
                .to_string(),
            &report.plans,
            color,
        )?;
    }

    let input = dunce::canonicalize(&report.input_dir).unwrap_or_else(|_| {
        report
            .input_dir
            .clone()
    });
    println!(
        "{} from {} ({}), {} skipped",
        TextUtils::count(report.plans.len(), "batch"),
        input.display(),
        TextUtils::count(report.scanned.files, "file"),
        report.skipped
    );
    println!("{}", summary_table(&report));

    if let Some(v) = report.verification
    {
        let line = if v.is_consistent()
        {
            format!(
                "All files batched correctly: {} ({})",
                TextUtils::count(v.found.files, "file"),
                SizeUtils::mib(v.found.bytes)
            )
        }
        else
        {
            format!(
                "Mismatch: expected {} ({}), found {} ({})",
                TextUtils::count(v.expected.files, "file"),
                SizeUtils::mib(v.expected.bytes),
                TextUtils::count(v.found.files, "file"),
                SizeUtils::mib(v.found.bytes)
            )
        };
        match (color, v.is_consistent())
        {
            (false, _) => println!("{line}"),
            (true, true) => println!("{} {}", "✓".green(), line.green()),
            (true, false) => println!("{} {}", "!".red(), line.yellow()),
        }
    }

    let failures: Vec<&EntryError> = report
        .failures()
        .collect();
    if !failures.is_empty()
    {
        eprintln!("{} entries failed:", failures.len());
        for err in failures
        {
            eprintln!("  - {err}");
        }
    }

    Ok(())
}
