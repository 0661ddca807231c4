//! Per-batch JSON manifest (`batch_manifest.json`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::packer::PlannedCopy;
use crate::error::{EntryError, EntryOp};

pub const MANIFEST_FILE: &str = "batch_manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchManifest {
    /// Batch directory name, e.g. `batch_03`
    pub batch_path: String,
    pub file_count: usize,
    pub total_size: u64,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the input directory
    pub path: String,
    pub size: u64,
    /// Path relative to the batch directory
    pub target: String,
}

impl BatchManifest {
    /// Manifest for the entries that were actually copied.
    pub fn from_copies<'a, I>(batch_path: String, copies: I) -> Self
    where
        I: IntoIterator<Item = &'a PlannedCopy>,
    {
        let files: Vec<ManifestEntry> = copies
            .into_iter()
            .map(|c| ManifestEntry {
                path: slash_path(&c.relative_path),
                size: c.size,
                target: slash_path(&c.target()),
            })
            .collect();

        Self {
            batch_path,
            file_count: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
            files,
        }
    }
}

fn slash_path(p: &Path) -> String {
    p.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Write `manifest` to `batch_dir/batch_manifest.json`, replacing any
/// existing file. The directory must exist.
pub fn write_manifest(batch_dir: &Path, manifest: &BatchManifest) -> Result<PathBuf, EntryError> {
    let path = batch_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| EntryError::new(&path, EntryOp::WriteManifest, e.into()))?;
    fs::write(&path, json).map_err(|e| EntryError::new(&path, EntryOp::WriteManifest, e))?;
    Ok(path)
}

pub fn read_manifest(batch_dir: &Path) -> anyhow::Result<BatchManifest> {
    let path = batch_dir.join(MANIFEST_FILE);
    let text = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn copy(rel: &str, size: u64, subfolder: &str, name: &str) -> PlannedCopy {
        PlannedCopy {
            source: Path::new("/in").join(rel),
            relative_path: PathBuf::from(rel),
            size,
            subfolder: subfolder.to_string(),
            file_name: name.to_string(),
        }
    }

    #[test]
    fn test_manifest_json_shape() {
        let copies = [
            copy("Trip/a.jpg", 10, "Trip_01", "a.jpg"),
            copy("b.txt", 5, "root_01", "b.txt"),
        ];
        let manifest = BatchManifest::from_copies("batch_01".to_string(), &copies);
        assert_eq!(manifest.file_count, 2);
        assert_eq!(manifest.total_size, 15);

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["batchPath"], "batch_01");
        assert_eq!(value["fileCount"], 2);
        assert_eq!(value["totalSize"], 15);
        assert_eq!(value["files"][0]["path"], "Trip/a.jpg");
        assert_eq!(value["files"][0]["target"], "Trip_01/a.jpg");
        assert_eq!(value["files"][1]["size"], 5);
    }

    #[test]
    fn test_write_overwrites_existing_manifest() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILE), "stale").unwrap();

        let manifest = BatchManifest::from_copies("batch_02".to_string(), &[copy("x", 1, "root_01", "x")]);
        let path = write_manifest(tmp.path(), &manifest).unwrap();

        assert_eq!(path, tmp.path().join(MANIFEST_FILE));
        assert_eq!(read_manifest(tmp.path()).unwrap(), manifest);
    }

    #[test]
    fn test_write_into_missing_dir_fails_with_entry_error() {
        let tmp = TempDir::new().unwrap();
        let manifest = BatchManifest::from_copies("batch_01".to_string(), &[]);
        let err = write_manifest(&tmp.path().join("absent"), &manifest).unwrap_err();
        assert_eq!(err.op, EntryOp::WriteManifest);
    }
}
