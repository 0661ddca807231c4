//! Filepath: src/infra/walk.rs
//! Recursive tree scanner with optional in-place renaming.
//! - Skips unwanted, hidden and OS metadata entries
//! - Applies the extension allow-list to files
//! - Renames files and directories to generated names when asked
//! - Deterministic ordering (entries visited in name order)
//!
//! A directory's new name is chosen before its subtree is scanned, so children
//! are named after the directory's final name. The directory itself is renamed
//! only after its subtree has been scanned. The descriptors collected below it
//! are then rebased onto the new path by prefix substitution, so every returned
//! path points at the file as it exists on disk when the scan finishes.
//!
//! `RenameMode::Preview` claims names the same way against an in-memory view
//! of each directory and reports the planned relative paths.
//!
//! Nothing here aborts the scan: unreadable directories and files that cannot
//! be stat'd or renamed are recorded as `Exclusion`s and logged.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::core::naming::{generate_name, is_disambiguated, with_suffix};
use crate::error::{EntryError, EntryOp};
use crate::infra::filters::{ExtensionFilter, FilterReason, IgnoreRules};

/// Group label for files directly under the scan root.
pub const ROOT_GROUP: &str = "root";

/// One discovered input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor
{
    /// Current location on disk (after any rename)
    pub absolute_path: PathBuf,

    /// Location relative to the scan root (the planned one under preview);
    /// first component names the group
    pub relative_path: PathBuf,

    /// Byte size captured at scan time
    pub size: u64,

    /// Name the file receives inside its batch
    pub display_name: String,

    /// Creation time (modification time where birth time is unsupported)
    pub created: Option<SystemTime>,
}

impl FileDescriptor
{
    /// Top-level subfolder this file belongs to, or `ROOT_GROUP`.
    pub fn group(&self) -> String
    {
        let mut components = self
            .relative_path
            .components();
        match (components.next(), components.next())
        {
            (Some(first), Some(_)) => first
                .as_os_str()
                .to_string_lossy()
                .into_owned(),
            _ => ROOT_GROUP.to_string(),
        }
    }
}

/// Why an entry is absent from the scan result.
#[derive(Debug)]
pub enum ExclusionCause
{
    Filtered(FilterReason),
    Failed(EntryError),
}

#[derive(Debug)]
pub struct Exclusion
{
    pub path: PathBuf,
    pub cause: ExclusionCause,
}

/// Result of a scan: retained files plus everything left out, with the reason.
#[derive(Debug, Default)]
pub struct ScanOutcome
{
    pub files: Vec<FileDescriptor>,
    pub excluded: Vec<Exclusion>,
}

impl ScanOutcome
{
    /// Sum of retained file sizes.
    pub fn total_size(&self) -> u64
    {
        self.files
            .iter()
            .map(|f| f.size)
            .sum()
    }

    /// Entries dropped because of I/O failures.
    pub fn failures(&self) -> impl Iterator<Item = &EntryError>
    {
        self.excluded
            .iter()
            .filter_map(|e| match &e.cause
            {
                ExclusionCause::Failed(err) => Some(err),
                ExclusionCause::Filtered(_) => None,
            })
    }

    /// Entries dropped by the ignore or extension filters.
    pub fn filtered(&self) -> impl Iterator<Item = (&Path, FilterReason)>
    {
        self.excluded
            .iter()
            .filter_map(|e| match e.cause
            {
                ExclusionCause::Filtered(reason) => Some((e.path.as_path(), reason)),
                ExclusionCause::Failed(_) => None,
            })
    }

    fn filter(
        &mut self,
        path: PathBuf,
        reason: FilterReason,
    )
    {
        debug!(path = %path.display(), %reason, "skipped");
        self.excluded
            .push(Exclusion {
                path,
                cause: ExclusionCause::Filtered(reason),
            });
    }

    fn fail(
        &mut self,
        err: EntryError,
    )
    {
        warn!("{err}");
        self.excluded
            .push(Exclusion {
                path: err
                    .path
                    .clone(),
                cause: ExclusionCause::Failed(err),
            });
    }

    fn absorb(
        &mut self,
        other: ScanOutcome,
    )
    {
        self.files
            .extend(other.files);
        self.excluded
            .extend(other.excluded);
    }

    /// Move every collected file under `from` to the same place under `to`.
    fn rebase(
        &mut self,
        from: &Path,
        to: &Path,
        from_rel: &Path,
        to_rel: &Path,
    )
    {
        for file in &mut self.files
        {
            if let Ok(rest) = file
                .absolute_path
                .strip_prefix(from)
            {
                file.absolute_path = to.join(rest);
            }
            if let Ok(rest) = file
                .relative_path
                .strip_prefix(from_rel)
            {
                file.relative_path = to_rel.join(rest);
            }
        }
    }
}

/// What the scanner does with generated names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenameMode
{
    /// Keep original names
    #[default]
    Keep,
    /// Compute generated display names without touching the disk
    Preview,
    /// Rename files and directories in place
    Apply,
}

/// Recursive scanner configured with filters and a rename mode.
#[derive(Debug, Clone, Default)]
pub struct TreeScanner
{
    /// Name-based ignore rules
    ignore: IgnoreRules,

    /// Extension allow-list for files
    extensions: ExtensionFilter,

    /// Rename behavior; default keeps names
    rename: RenameMode,
}

impl TreeScanner
{
    pub fn new(
        ignore: IgnoreRules,
        extensions: ExtensionFilter,
    ) -> Self
    {
        Self {
            ignore,
            extensions,
            rename: RenameMode::Keep,
        }
    }

    /// (Optional) Choose how generated names are used.
    pub fn with_rename(
        mut self,
        mode: RenameMode,
    ) -> Self
    {
        self.rename = mode;
        self
    }

    /// Scan everything below `root`. The root itself is never renamed.
    pub fn scan<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> ScanOutcome
    {
        let root = root.as_ref();
        self.scan_dir(root, root, Path::new(""), Path::new(""))
    }

    fn scan_dir(
        &self,
        root: &Path,
        dir: &Path,
        rel: &Path,
        planned: &Path,
    ) -> ScanOutcome
    {
        let mut out = ScanOutcome::default();

        let entries = match read_sorted(dir, &mut out)
        {
            Ok(entries) => entries,
            Err(err) =>
            {
                // Unreadable directory counts as empty
                out.fail(err);
                return out;
            }
        };

        // Every name present in this directory, for collision checks
        let mut taken: HashSet<String> = entries
            .iter()
            .map(|e| {
                e.name
                    .clone()
            })
            .collect();

        for entry in entries
        {
            let path = dir.join(&entry.name);

            if let Some(reason) = self
                .ignore
                .classify(&entry.name)
            {
                out.filter(path, reason);
                continue;
            }

            if entry
                .file_type
                .is_dir()
            {
                // Children are named after the directory's final name
                let target = self.claim_name(root, planned, &entry.name, true, &mut taken);
                let final_name = target
                    .as_deref()
                    .unwrap_or(&entry.name);
                let child_rel = rel.join(&entry.name);
                let child_planned = planned.join(final_name);
                let mut sub = self.scan_dir(root, &path, &child_rel, &child_planned);

                if let (Some(target), RenameMode::Apply) = (&target, self.rename)
                {
                    match rename_on_disk(dir, &entry.name, target)
                    {
                        Ok(()) => sub.rebase(
                            &path,
                            &dir.join(target),
                            &child_rel,
                            &rel.join(target),
                        ),
                        // Descendants stay valid under the old name
                        Err(err) =>
                        {
                            release_name(&entry.name, target, &mut taken);
                            out.fail(err);
                        }
                    }
                }

                out.absorb(sub);
            }
            else if entry
                .file_type
                .is_file()
            {
                if !self
                    .extensions
                    .allows(&entry.name)
                {
                    out.filter(path, FilterReason::Extension);
                    continue;
                }

                let meta = match fs::metadata(&path)
                {
                    Ok(meta) => meta,
                    Err(source) =>
                    {
                        out.fail(EntryError::new(&path, EntryOp::Stat, source));
                        continue;
                    }
                };

                let target = self.claim_name(root, planned, &entry.name, false, &mut taken);
                let name = target
                    .clone()
                    .unwrap_or_else(|| {
                        entry
                            .name
                            .clone()
                    });

                let (absolute_path, relative_path) = match (&target, self.rename)
                {
                    (Some(target), RenameMode::Apply) =>
                    {
                        if let Err(err) = rename_on_disk(dir, &entry.name, target)
                        {
                            release_name(&entry.name, target, &mut taken);
                            out.fail(err);
                            continue;
                        }
                        (dir.join(target), rel.join(target))
                    }
                    // Preview leaves the file where it is but reports where it would go
                    (_, RenameMode::Preview) => (path, planned.join(&name)),
                    _ => (path, rel.join(&entry.name)),
                };

                out.files
                    .push(FileDescriptor {
                        absolute_path,
                        relative_path,
                        size: meta.len(),
                        display_name: name,
                        created: meta
                            .created()
                            .or_else(|_| meta.modified())
                            .ok(),
                    });
            }
            else
            {
                out.filter(path, FilterReason::NotRegular);
            }
        }

        out
    }

    /// Reserve the generated name of `name` among its siblings. Returns the
    /// new name, or `None` when names are kept or the entry already carries it.
    fn claim_name(
        &self,
        root: &Path,
        planned: &Path,
        name: &str,
        is_dir: bool,
        taken: &mut HashSet<String>,
    ) -> Option<String>
    {
        if self.rename == RenameMode::Keep
        {
            return None;
        }

        let generated = generate_name(&root.join(planned).join(name), root, is_dir);
        let target = pick_target(name, &generated, is_dir, taken)?;
        taken.remove(name);
        taken.insert(target.clone());
        Some(target)
    }
}

struct DirItem
{
    name: String,
    file_type: fs::FileType,
}

/// Read `dir` and sort entries by name. Entries whose type cannot be read are
/// recorded on `out` and left out.
fn read_sorted(
    dir: &Path,
    out: &mut ScanOutcome,
) -> Result<Vec<DirItem>, EntryError>
{
    let reader = fs::read_dir(dir).map_err(|e| EntryError::new(dir, EntryOp::ReadDir, e))?;

    let mut items = Vec::new();
    for res in reader
    {
        let entry = match res
        {
            Ok(entry) => entry,
            Err(source) =>
            {
                out.fail(EntryError::new(dir, EntryOp::ReadDir, source));
                continue;
            }
        };
        let name = entry
            .file_name()
            .to_string_lossy()
            .into_owned();
        match entry.file_type()
        {
            Ok(file_type) => items.push(DirItem { name, file_type }),
            Err(source) => out.fail(EntryError::new(&entry.path(), EntryOp::Stat, source)),
        }
    }

    items.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
    });
    Ok(items)
}

fn rename_on_disk(
    dir: &Path,
    name: &str,
    target: &str,
) -> Result<(), EntryError>
{
    let path = dir.join(name);
    fs::rename(&path, dir.join(target))
        .map_err(|source| EntryError::new(&path, EntryOp::Rename, source))?;
    debug!(from = %path.display(), to = %target, "renamed");
    Ok(())
}

/// Give a reserved name back after a failed rename.
fn release_name(
    name: &str,
    target: &str,
    taken: &mut HashSet<String>,
)
{
    taken.remove(target);
    taken.insert(name.to_string());
}

/// First free name among `generated`, `generated-2`, `generated-3`, … or
/// `None` if `current` is already one of them. A candidate that differs from
/// a sibling only by case counts as taken.
fn pick_target(
    current: &str,
    generated: &str,
    is_dir: bool,
    taken: &HashSet<String>,
) -> Option<String>
{
    if current == generated || is_disambiguated(current, generated, is_dir)
    {
        return None;
    }

    let current_lower = current.to_lowercase();
    let taken_lower: HashSet<String> = taken
        .iter()
        .map(|t| t.to_lowercase())
        .collect();

    let clashes = |candidate: &str| {
        let lower = candidate.to_lowercase();
        taken.contains(candidate) || (lower != current_lower && taken_lower.contains(&lower))
    };

    std::iter::once(generated.to_string())
        .chain((2..).map(|n| with_suffix(generated, n, is_dir)))
        .find(|candidate| candidate == current || !clashes(candidate.as_str()))
        .filter(|candidate| candidate != current)
}
