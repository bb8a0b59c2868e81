//! Domain-scoped ignore rules and their priority-ordered set.
//!
//! A [`Pattern`] is one line of an ignore file bound to the directory it was
//! found in (its *domain*, as path segments from the ignore root). A
//! [`PatternSet`] is an append-only list of patterns where position is the
//! only carrier of priority: when several patterns match a path, the one
//! appended last decides, negations included.
//!
//! Matching a single rule is delegated to the gitignore matcher from the
//! `ignore` crate. This module only adds the domain scoping and the
//! last-match-wins composition on top.

use std::fmt;
use std::path::{Component, Path};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Verdict of matching a path against a pattern or a pattern set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// No rule applies to the path.
    None,
    /// The path is excluded.
    Exclude,
    /// The path is explicitly re-included by a negated rule.
    Include,
}

impl Match {
    /// Returns `true` if this verdict excludes the path.
    pub fn is_exclude(self) -> bool {
        self == Match::Exclude
    }
}

/// A single ignore rule scoped to a directory domain.
///
/// Patterns are immutable once parsed.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    domain: Vec<String>,
    matcher: Gitignore,
}

impl Pattern {
    /// Parses one ignore-file line, scoped to `domain`.
    ///
    /// The line follows gitignore syntax: a leading `!` negates, a leading
    /// `/` anchors to the domain directory and a trailing `/` restricts the
    /// rule to directories.
    pub fn parse<S: AsRef<str>>(line: &str, domain: &[S]) -> Result<Self, ignore::Error> {
        // Paths handed to the matcher are already relative to the domain,
        // so the matcher root must not strip anything from them.
        let mut builder = GitignoreBuilder::new(".");
        builder.add_line(None, line)?;
        let matcher = builder.build()?;

        Ok(Self {
            source: line.to_string(),
            domain: domain.iter().map(|s| s.as_ref().to_string()).collect(),
            matcher,
        })
    }

    /// The original pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Path segments, from the ignore root, of the directory this rule belongs to.
    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    /// Matches a path given relative to the ignore root.
    ///
    /// Paths outside the pattern's domain never match. A rule matching any
    /// parent directory inside the domain applies to the path as well.
    pub fn matched(&self, path: &Path, is_dir: bool) -> Match {
        let segments = segments(path);
        self.matched_segments(&segments, is_dir)
    }

    fn matched_segments(&self, segments: &[&str], is_dir: bool) -> Match {
        if segments.len() <= self.domain.len() {
            return Match::None;
        }
        let in_domain = self
            .domain
            .iter()
            .zip(segments)
            .all(|(domain, segment)| domain == segment);
        if !in_domain {
            return Match::None;
        }

        let relative = segments[self.domain.len()..].join("/");
        match self
            .matcher
            .matched_path_or_any_parents(Path::new(&relative), is_dir)
        {
            ignore::Match::None => Match::None,
            ignore::Match::Ignore(_) => Match::Exclude,
            ignore::Match::Whitelist(_) => Match::Include,
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("source", &self.source)
            .field("domain", &self.domain)
            .finish()
    }
}

/// Priority-ordered list of [`Pattern`]s.
///
/// Later entries outrank earlier ones. Patterns are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pattern with higher priority than every pattern already present.
    pub fn push(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterates patterns from lowest to highest priority.
    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }

    /// Pattern texts in priority order, lowest first.
    pub fn sources(&self) -> Vec<&str> {
        self.patterns.iter().map(Pattern::as_str).collect()
    }

    /// Matches a path (relative to the ignore root) against the whole set.
    ///
    /// Walks from the highest-priority pattern down and returns the first
    /// verdict that is not [`Match::None`].
    pub fn matched(&self, path: &Path, is_dir: bool) -> Match {
        let segments = segments(path);
        self.patterns
            .iter()
            .rev()
            .map(|pattern| pattern.matched_segments(&segments, is_dir))
            .find(|verdict| *verdict != Match::None)
            .unwrap_or(Match::None)
    }

    /// Returns `true` if the path is excluded by the set.
    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        self.matched(path, is_dir).is_exclude()
    }
}

impl Extend<Pattern> for PatternSet {
    fn extend<T: IntoIterator<Item = Pattern>>(&mut self, iter: T) {
        self.patterns.extend(iter);
    }
}

impl FromIterator<Pattern> for PatternSet {
    fn from_iter<T: IntoIterator<Item = Pattern>>(iter: T) -> Self {
        Self {
            patterns: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PatternSet {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}

/// Splits a relative path into its normal segments, dropping `.` and root parts.
fn segments(path: &Path) -> Vec<&str> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect()
}
