//! Template path resolution for file batches.

use std::fs;
use std::path::{Path, PathBuf};

/// Resolves a template reference to a concrete file path.
///
/// Absolute references are returned unchanged without checking that they
/// exist; the engine reports missing files itself. Relative references are
/// joined onto each search directory in order and the first candidate that
/// is a regular file wins. Directories and special files are skipped;
/// symlinks count if they point at a regular file.
///
/// Returns `None` if no search directory holds the template.
pub fn resolve_template_path<P: AsRef<Path>>(template: &str, search_dirs: &[P]) -> Option<PathBuf> {
    let reference = Path::new(template);
    if reference.is_absolute() {
        return Some(reference.to_path_buf());
    }

    search_dirs
        .iter()
        .map(|dir| dir.as_ref().join(reference))
        .find(|candidate| {
            fs::metadata(candidate)
                .map(|meta| meta.is_file())
                .unwrap_or(false)
        })
}
