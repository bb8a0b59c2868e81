//! Layered collection of `.templateignore` rules.
//!
//! [`PatternCollector`] produces one [`PatternSet`] for an ignore root, an
//! optional subdirectory scope and caller-supplied exclusions. Patterns are
//! appended in three layers, lowest priority first:
//!
//! ```text
//! root/.templateignore              ancestor chain (only with a scope),
//! root/a/.templateignore            root-to-leaf, scope itself excluded
//! root/a/b/.templateignore          subtree of the scope, depth-first,
//! root/a/b/c/.templateignore        parents before children
//! explicit excludes                 scoped to the scope, always last
//! ```
//!
//! Because the set is last-match-wins, deeper files outrank their ancestors
//! and explicit excludes outrank everything read from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::IgnoreError;
use crate::pattern::{Pattern, PatternSet};

/// Name of the per-directory ignore file.
pub const IGNORE_FILE_NAME: &str = ".templateignore";

const COMMENT_PREFIX: char = '#';

/// Builder that collects the layered pattern set for one ignore root.
///
/// # Example
///
/// ```rust,ignore
/// let patterns = PatternCollector::new("./site")
///     .subdir("templates/mail")
///     .exclude("*.log")
///     .collect()?;
/// ```
#[derive(Debug, Clone)]
pub struct PatternCollector {
    root: PathBuf,
    subdir: Vec<String>,
    excludes: Vec<String>,
}

impl PatternCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subdir: Vec::new(),
            excludes: Vec::new(),
        }
    }

    /// Restricts the subtree walk to a slash-separated path below the root.
    ///
    /// Empty and `.` segments are dropped, so `""` and `"."` mean the root.
    pub fn subdir(mut self, subdir: &str) -> Self {
        self.subdir = split_subdir(subdir);
        self
    }

    /// Adds one explicit exclusion, applied with the highest priority.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    /// Adds several explicit exclusions, in order.
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Segments of the subdirectory scope, empty when collecting from the root.
    pub fn scope(&self) -> &[String] {
        &self.subdir
    }

    /// Reads every relevant ignore file and returns the ordered set.
    ///
    /// Fails on the first unreadable ignore file or directory; no partial
    /// set is returned.
    pub fn collect(&self) -> Result<PatternSet, IgnoreError> {
        let mut set = PatternSet::new();

        let mut domain: Vec<String> = Vec::with_capacity(self.subdir.len());
        for segment in &self.subdir {
            let file = domain_dir(&self.root, &domain[..]).join(IGNORE_FILE_NAME);
            set.extend(read_ignore_file(&file, &domain[..])?);
            domain.push(segment.clone());
        }

        collect_subtree(&self.root, &mut domain, &mut set)?;

        for line in &self.excludes {
            if let Some(pattern) = parse_line(line, &domain[..], None) {
                set.push(pattern);
            }
        }

        debug!(
            root = %self.root.display(),
            scope = %self.subdir.join("/"),
            patterns = set.len(),
            "collected ignore patterns"
        );
        Ok(set)
    }
}

/// Reads one ignore file into patterns scoped to `domain`.
///
/// Blank lines and lines starting with `#` are skipped. A missing file
/// yields no patterns; any other read failure is an error.
pub fn read_ignore_file<S: AsRef<str>>(
    path: &Path,
    domain: &[S],
) -> Result<Vec<Pattern>, IgnoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(IgnoreError::io(path, err)),
    };

    Ok(content
        .lines()
        .filter(|line| !line.starts_with(COMMENT_PREFIX) && !line.trim().is_empty())
        .filter_map(|line| parse_line(line, domain, Some(path)))
        .collect())
}

fn collect_subtree(
    root: &Path,
    domain: &mut Vec<String>,
    set: &mut PatternSet,
) -> Result<(), IgnoreError> {
    let dir = domain_dir(root, &domain[..]);
    set.extend(read_ignore_file(&dir.join(IGNORE_FILE_NAME), &domain[..])?);

    for child in child_dirs(&dir)? {
        domain.push(child);
        collect_subtree(root, domain, set)?;
        domain.pop();
    }
    Ok(())
}

/// Names of the directories directly inside `dir`, sorted.
///
/// Symlinks are not followed.
fn child_dirs(dir: &Path) -> Result<Vec<String>, IgnoreError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| IgnoreError::io(dir, e))? {
        let entry = entry.map_err(|e| IgnoreError::io(dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| IgnoreError::io(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!(
                dir = %dir.display(),
                name = ?name,
                "skipping directory with a non UTF-8 name"
            ),
        }
    }
    names.sort();
    Ok(names)
}

fn parse_line<S: AsRef<str>>(line: &str, domain: &[S], origin: Option<&Path>) -> Option<Pattern> {
    match Pattern::parse(line, domain) {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            warn!(
                pattern = line,
                origin = ?origin,
                error = %err,
                "skipping invalid ignore pattern"
            );
            None
        }
    }
}

fn domain_dir<S: AsRef<str>>(root: &Path, domain: &[S]) -> PathBuf {
    domain
        .iter()
        .fold(root.to_path_buf(), |dir, segment| dir.join(segment.as_ref()))
}

pub(crate) fn split_subdir(subdir: &str) -> Vec<String> {
    subdir
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .map(str::to_string)
        .collect()
}
