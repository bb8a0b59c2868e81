//! Error types for ignore-pattern collection.

use std::io;
use std::path::{Path, PathBuf};

/// Errors that abort pattern collection or the eligible-file walk.
///
/// A missing ignore file is not an error; it simply contributes no patterns.
#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    /// Reading an ignore file or a directory listing failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl IgnoreError {
    pub(crate) fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// The path that could not be read.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } => path,
        }
    }
}
