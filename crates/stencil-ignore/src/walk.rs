//! Eligible-file discovery.
//!
//! Walks a tree below an ignore root and keeps the regular files that a
//! [`PatternSet`] does not exclude. Excluded directories are pruned without
//! descending into them, and ignore files themselves are never eligible.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::collector::{split_subdir, IGNORE_FILE_NAME};
use crate::error::IgnoreError;
use crate::pattern::PatternSet;

/// Lists files under `root` (or under `subdir` below it) that are not excluded.
///
/// Returned paths are relative to `root`, in depth-first name order.
/// Symlinked directories are not followed; symlinks to regular files are
/// listed.
pub fn eligible_files(
    root: &Path,
    subdir: Option<&str>,
    patterns: &PatternSet,
) -> Result<Vec<PathBuf>, IgnoreError> {
    let start: PathBuf = subdir.map(split_subdir).unwrap_or_default().iter().collect();
    let mut files = Vec::new();
    walk(root, &start, patterns, &mut files)?;
    debug!(root = %root.display(), eligible = files.len(), "walked template tree");
    Ok(files)
}

fn walk(
    root: &Path,
    rel_dir: &Path,
    patterns: &PatternSet,
    files: &mut Vec<PathBuf>,
) -> Result<(), IgnoreError> {
    let dir = root.join(rel_dir);

    let mut entries = Vec::new();
    for entry in fs::read_dir(&dir).map_err(|e| IgnoreError::io(&dir, e))? {
        let entry = entry.map_err(|e| IgnoreError::io(&dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| IgnoreError::io(entry.path(), e))?;
        entries.push((entry.file_name(), file_type.is_dir()));
    }
    entries.sort();

    for (name, is_dir) in entries {
        if name == IGNORE_FILE_NAME {
            continue;
        }
        let rel = rel_dir.join(&name);

        if is_dir {
            if !patterns.is_excluded(&rel, true) {
                walk(root, &rel, patterns, files)?;
            }
            continue;
        }

        let is_file = fs::metadata(root.join(&rel))
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if is_file && !patterns.is_excluded(&rel, false) {
            files.push(rel);
        }
    }
    Ok(())
}
