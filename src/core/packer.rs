//! Filepath: src/core/packer.rs
//! Greedy size-bounded batch packing.
//!
//! Planning is pure: `plan` turns scanned descriptors into `BatchPlan`s
//! without touching the disk. `execute` then copies every planned entry in
//! plan order and writes one manifest per batch.
//!
//! Layout produced by a plan:
//!   batch_01/
//!     wedding_01/wedding_img.jpg
//!     root_01/notes.txt
//!   batch_02/
//!     wedding_02/...

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::core::manifest::{BatchManifest, write_manifest};
use crate::core::naming::with_suffix;
use crate::error::{ConfigError, EntryError, EntryOp, SplitError};
use crate::infra::walk::FileDescriptor;

/// `batch_01`, `batch_02`, ... (wider indices are not truncated)
pub fn batch_dir_name(index: u32) -> String {
    format!("batch_{index:02}")
}

/// `<group>_01`, `<group>_02`, ...
pub fn subfolder_dir_name(group: &str, occurrence: u32) -> String {
    format!("{group}_{occurrence:02}")
}

/// One file scheduled for copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCopy {
    pub source: PathBuf,
    /// Input-relative path, as recorded in the manifest
    pub relative_path: PathBuf,
    pub size: u64,
    /// Batch-local subfolder, `<group>_<NN>`
    pub subfolder: String,
    /// Name inside `subfolder`
    pub file_name: String,
}

impl PlannedCopy {
    /// Destination relative to the batch directory.
    pub fn target(&self) -> PathBuf {
        Path::new(&self.subfolder).join(&self.file_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// 1-based
    pub index: u32,
    pub accumulated_size: u64,
    /// Holds a single file larger than the batch limit
    pub oversized: bool,
    pub entries: Vec<PlannedCopy>,
}

impl BatchPlan {
    pub fn dir_name(&self) -> String {
        batch_dir_name(self.index)
    }
}

/// Files grouped by top-level subfolder (first-seen order), each group
/// sorted by creation time then relative path. Missing timestamps sort first.
pub fn offering_order(files: &[FileDescriptor]) -> Vec<&FileDescriptor> {
    let mut groups: IndexMap<String, Vec<&FileDescriptor>> = IndexMap::new();
    for file in files {
        groups.entry(file.group()).or_default().push(file);
    }

    groups
        .into_values()
        .flat_map(|mut group| {
            group.sort_by(|a, b| {
                a.created
                    .cmp(&b.created)
                    .then_with(|| a.relative_path.cmp(&b.relative_path))
            });
            group
        })
        .collect()
}

/// Placement state threaded through a packing run.
#[derive(Debug)]
pub struct PackerState {
    batch_size: u64,
    batches: Vec<BatchPlan>,
    /// Position of the batch accepting regular files
    open: Option<usize>,
    /// Last occurrence handed out per group, across the whole run
    occurrences: HashMap<String, u32>,
    /// Group → occurrence inside the open batch
    assigned: HashMap<String, u32>,
    /// (subfolder, lower-cased name) pairs used in the open batch
    used_names: HashSet<(String, String)>,
}

impl PackerState {
    pub fn new(batch_size: u64) -> Self {
        Self {
            batch_size,
            batches: Vec::new(),
            open: None,
            occurrences: HashMap::new(),
            assigned: HashMap::new(),
            used_names: HashSet::new(),
        }
    }

    /// Assign one file to a batch.
    pub fn place(&mut self, file: &FileDescriptor) {
        let group = file.group();

        if file.size > self.batch_size {
            let occurrence = self.next_occurrence(&group);
            let index = self.next_index();
            debug!(file = %file.relative_path.display(), size = file.size, batch = index, "oversized");
            self.batches.push(BatchPlan {
                index,
                accumulated_size: file.size,
                oversized: true,
                entries: vec![planned(file, subfolder_dir_name(&group, occurrence), file.display_name.clone())],
            });
            return;
        }

        let fits = self
            .open
            .filter(|&i| self.batches[i].accumulated_size.saturating_add(file.size) <= self.batch_size);
        let open = match fits {
            Some(i) => i,
            None => self.open_batch(),
        };

        let occurrence = match self.assigned.get(&group) {
            Some(&occurrence) => occurrence,
            None => {
                let occurrence = self.next_occurrence(&group);
                self.assigned.insert(group.clone(), occurrence);
                occurrence
            }
        };
        let subfolder = subfolder_dir_name(&group, occurrence);
        let name = self.unique_name(&subfolder, &file.display_name);

        let batch = &mut self.batches[open];
        batch.accumulated_size += file.size;
        batch.entries.push(planned(file, subfolder, name));
    }

    pub fn finish(self) -> Vec<BatchPlan> {
        self.batches
    }

    fn next_index(&self) -> u32 {
        u32::try_from(self.batches.len()).map_or(u32::MAX, |n| n.saturating_add(1))
    }

    fn next_occurrence(&mut self, group: &str) -> u32 {
        let counter = self.occurrences.entry(group.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    fn open_batch(&mut self) -> usize {
        let index = self.next_index();
        self.batches.push(BatchPlan {
            index,
            accumulated_size: 0,
            oversized: false,
            entries: Vec::new(),
        });
        self.assigned.clear();
        self.used_names.clear();

        let position = self.batches.len() - 1;
        self.open = Some(position);
        position
    }

    /// `name`, or the first `with_suffix` variant not yet used in `subfolder`.
    fn unique_name(&mut self, subfolder: &str, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut n = 2;
        while !self
            .used_names
            .insert((subfolder.to_string(), candidate.to_lowercase()))
        {
            candidate = with_suffix(name, n, false);
            n += 1;
        }
        candidate
    }
}

fn planned(file: &FileDescriptor, subfolder: String, file_name: String) -> PlannedCopy {
    PlannedCopy {
        source: file.absolute_path.clone(),
        relative_path: file.relative_path.clone(),
        size: file.size,
        subfolder,
        file_name,
    }
}

/// Pack `files` into batches of at most `batch_size` bytes.
pub fn plan(files: &[FileDescriptor], batch_size: u64) -> Vec<BatchPlan> {
    let mut state = PackerState::new(batch_size);
    for file in offering_order(files) {
        state.place(file);
    }
    state.finish()
}

/// What to do when a copy fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyPolicy {
    /// Record the failure and keep going
    #[default]
    Continue,
    /// Stop the run at the first failure
    Abort,
}

impl FromStr for CopyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            _ => Err(ConfigError::InvalidCopyPolicy { value: s.to_string() }),
        }
    }
}

impl fmt::Display for CopyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("continue"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    pub policy: CopyPolicy,
    pub write_manifest: bool,
}

/// Per-batch result of `execute`.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub index: u32,
    pub path: PathBuf,
    pub oversized: bool,
    pub file_count: usize,
    pub total_size: u64,
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub batches: Vec<BatchOutcome>,
    pub failures: Vec<EntryError>,
}

impl ExecutionReport {
    pub fn copied_files(&self) -> usize {
        self.batches.iter().map(|b| b.file_count).sum()
    }

    pub fn copied_bytes(&self) -> u64 {
        self.batches.iter().map(|b| b.total_size).sum()
    }
}

/// Copy every planned entry under `batch_root` and write manifests.
///
/// Copies run one at a time in plan order. Sources are never moved. Under
/// `CopyPolicy::Abort` the first failure ends the run; batches finished
/// before it keep their manifests.
pub fn execute(
    plans: &[BatchPlan],
    batch_root: &Path,
    options: &CopyOptions,
    progress: &ProgressBar,
) -> Result<ExecutionReport, SplitError> {
    let mut report = ExecutionReport::default();

    for plan in plans {
        let dir = batch_root.join(plan.dir_name());
        progress.set_message(plan.dir_name());

        let mut copied: Vec<&PlannedCopy> = Vec::with_capacity(plan.entries.len());
        for entry in &plan.entries {
            match copy_entry(&dir, entry) {
                Ok(()) => copied.push(entry),
                Err(err) if options.policy == CopyPolicy::Abort => {
                    return Err(SplitError::CopyAborted(err));
                }
                Err(err) => {
                    warn!("{err}");
                    report.failures.push(err);
                }
            }
            progress.inc(1);
        }

        let manifest_body = BatchManifest::from_copies(plan.dir_name(), copied.iter().copied());
        let mut manifest = None;
        if options.write_manifest {
            let written = fs::create_dir_all(&dir)
                .map_err(|e| EntryError::new(&dir, EntryOp::CreateDir, e))
                .and_then(|()| write_manifest(&dir, &manifest_body));
            match written {
                Ok(path) => manifest = Some(path),
                Err(err) => {
                    warn!("{err}");
                    report.failures.push(err);
                }
            }
        }

        info!(batch = %plan.dir_name(), files = manifest_body.file_count, bytes = manifest_body.total_size, "batch written");
        report.batches.push(BatchOutcome {
            index: plan.index,
            path: dir,
            oversized: plan.oversized,
            file_count: manifest_body.file_count,
            total_size: manifest_body.total_size,
            manifest,
        });
    }

    Ok(report)
}

fn copy_entry(batch_dir: &Path, entry: &PlannedCopy) -> Result<(), EntryError> {
    let target = batch_dir.join(entry.target());
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| EntryError::new(parent, EntryOp::CreateDir, e))?;
    }
    fs::copy(&entry.source, &target).map_err(|e| EntryError::new(&entry.source, EntryOp::Copy, e))?;
    debug!(from = %entry.source.display(), to = %target.display(), "copied");
    Ok(())
}
