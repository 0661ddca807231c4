//! Filepath: src/core/tree.rs
//! Tree view of a batch plan, used by `split --dry-run`:
//!
//! ```text
//! batches/
//! ├─ batch_01/ (2 files, 400 B)
//! │  └─ A_01/
//! │     ├─ a1 (200 B)
//! │     └─ a2 (200 B)
//! └─ batch_02/ (1 file, 5000 B, oversized)
//! ```

use anyhow::Result;
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use ptree::TreeBuilder;
use ptree::item::StringItem;

use crate::core::packer::{BatchPlan, PlannedCopy};
use crate::infra::utils::{SizeUtils, TextUtils};

/// Build the plan tree rooted at `root_label`.
pub fn build_plan_tree(root_label: &str, plans: &[BatchPlan], color: bool) -> StringItem {
    let mut builder = TreeBuilder::new(dir_label(root_label, color));

    for plan in plans {
        let mut label = format!(
            "{} ({}, {}",
            dir_label(&plan.dir_name(), color),
            TextUtils::count(plan.entries.len(), "file"),
            SizeUtils::short(plan.accumulated_size)
        );
        if plan.oversized {
            if color {
                label.push_str(&format!(", {}", "oversized".yellow()));
            } else {
                label.push_str(", oversized");
            }
        }
        label.push(')');
        builder.begin_child(label);

        // Subfolders in first-placed order
        let mut subfolders: IndexMap<&str, Vec<&PlannedCopy>> = IndexMap::new();
        for entry in &plan.entries {
            subfolders.entry(entry.subfolder.as_str()).or_default().push(entry);
        }
        for (subfolder, entries) in subfolders {
            builder.begin_child(dir_label(subfolder, color));
            for entry in entries {
                builder.add_empty_child(format!("{} ({})", entry.file_name, SizeUtils::short(entry.size)));
            }
            builder.end_child();
        }

        builder.end_child();
    }

    builder.build()
}

/// Print the plan tree to stdout.
pub fn print_plan(root_label: &str, plans: &[BatchPlan], color: bool) -> Result<()> {
    let tree = build_plan_tree(root_label, plans, color);
    ptree::print_tree(&tree)?;
    Ok(())
}

fn dir_label(name: &str, color: bool) -> String {
    if color {
        format!("{}/", name.blue())
    } else {
        format!("{name}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(subfolder: &str, name: &str, size: u64) -> PlannedCopy {
        PlannedCopy {
            source: PathBuf::from("/in").join(name),
            relative_path: PathBuf::from(name),
            size,
            subfolder: subfolder.to_string(),
            file_name: name.to_string(),
        }
    }

    #[test]
    fn test_plan_tree_text() {
        let plans = vec![
            BatchPlan {
                index: 1,
                accumulated_size: 400,
                oversized: false,
                entries: vec![entry("A_01", "a1", 200), entry("root_01", "top", 200)],
            },
            BatchPlan {
                index: 2,
                accumulated_size: 5000,
                oversized: true,
                entries: vec![entry("A_02", "huge", 5000)],
            },
        ];

        let tree = build_plan_tree("batches", &plans, false);
        let mut out = Vec::new();
        ptree::write_tree(&tree, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("batches/"));
        assert!(text.contains("batch_01/ (2 files, 400 B)"));
        assert!(text.contains("batch_02/ (1 file, 5000 B, oversized)"));
        assert!(text.contains("A_01/"));
        assert!(text.contains("root_01/"));
        assert!(text.contains("huge (5000 B)"));
        // Children appear in plan order
        assert!(text.find("a1").unwrap() < text.find("top").unwrap());
    }
}
