//! Integration tests for layered ignore collection.
//!
//! Each test builds a throwaway tree with `.templateignore` files and checks
//! both the order of the collected set and the verdicts it produces.

use std::fs;
use std::path::Path;

use stencil_ignore::{eligible_files, IgnoreError, Match, PatternCollector, PatternSet};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn root_subtree_and_explicit_layers_in_order() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".templateignore", "*.bak\n");
    write(tmp.path(), "templates/.templateignore", "*.tmp\n");

    let set = PatternCollector::new(tmp.path())
        .exclude("*.log")
        .collect()
        .unwrap();

    assert_eq!(set.sources(), vec!["*.bak", "*.tmp", "*.log"]);
}

#[test]
fn scoped_collection_reads_ancestors_then_subtree() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".templateignore", "*.bak\n");
    write(tmp.path(), "templates/.templateignore", "*.tmp\n");

    let set = PatternCollector::new(tmp.path())
        .subdir("templates")
        .exclude("*.log")
        .collect()
        .unwrap();

    assert_eq!(set.sources(), vec!["*.bak", "*.tmp", "*.log"]);

    let domains: Vec<String> = set.iter().map(|p| p.domain().join("/")).collect();
    assert_eq!(domains, vec!["", "templates", "templates"]);
}

#[test]
fn no_ignore_files_and_no_excludes_is_empty() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("a/b/c")).unwrap();

    let set = PatternCollector::new(tmp.path()).collect().unwrap();
    assert!(set.is_empty());
}

// ============================================================================
// Verdicts
// ============================================================================

#[test]
fn file_matched_only_by_first_rule_is_excluded() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".templateignore", "*.bak\n");
    write(tmp.path(), "templates/.templateignore", "*.tmp\n");

    let set = PatternCollector::new(tmp.path())
        .exclude("*.log")
        .collect()
        .unwrap();

    assert!(set.is_excluded(Path::new("x.bak"), false));
    assert!(set.is_excluded(Path::new("templates/x.tmp"), false));
    assert!(set.is_excluded(Path::new("deep/er/x.log"), false));
    assert!(!set.is_excluded(Path::new("x.tmp"), false));
    assert!(!set.is_excluded(Path::new("x.txt"), false));
}

#[test]
fn later_negation_overrides_earlier_rule() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".templateignore", "*.bak\n");
    write(tmp.path(), "templates/.templateignore", "!x.bak\n");

    let set = PatternCollector::new(tmp.path()).collect().unwrap();

    assert_eq!(set.matched(Path::new("templates/x.bak"), false), Match::Include);
    assert_eq!(set.matched(Path::new("x.bak"), false), Match::Exclude);
}

#[test]
fn explicit_pattern_overrides_file_negation() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".templateignore", "!important.txt\n");

    let set = PatternCollector::new(tmp.path())
        .exclude("important.txt")
        .collect()
        .unwrap();

    assert!(set.is_excluded(Path::new("important.txt"), false));
}

#[test]
fn explicit_patterns_are_scoped_to_subdir() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("templates")).unwrap();

    let set = PatternCollector::new(tmp.path())
        .subdir("templates")
        .excludes(["*.log"])
        .collect()
        .unwrap();

    assert!(set.is_excluded(Path::new("templates/a.log"), false));
    assert!(!set.is_excluded(Path::new("a.log"), false));
}

// ============================================================================
// Errors and the eligible walk
// ============================================================================

#[cfg(unix)]
#[test]
fn unreadable_ignore_file_aborts_collection() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "sub/.templateignore", "*.bak\n");
    let file = tmp.path().join("sub/.templateignore");
    fs::set_permissions(&file, fs::Permissions::from_mode(0o000)).unwrap();

    // Root can read anything; nothing to assert in that case.
    if fs::read(&file).is_ok() {
        return;
    }

    let err = PatternCollector::new(tmp.path()).collect().unwrap_err();
    let IgnoreError::Io { path, .. } = err;
    assert_eq!(path, file);
}

#[test]
fn eligible_walk_uses_collected_layers() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".templateignore", "*.bak\n");
    write(tmp.path(), "templates/.templateignore", "*.tmp\n");
    write(tmp.path(), "templates/page.j2", "{{ title }}");
    write(tmp.path(), "templates/scratch.tmp", "");
    write(tmp.path(), "templates/old.bak", "");
    write(tmp.path(), "templates/run.log", "");
    write(tmp.path(), "readme.txt", "");

    let set = PatternCollector::new(tmp.path())
        .subdir("templates")
        .exclude("*.log")
        .collect()
        .unwrap();
    let files = eligible_files(tmp.path(), Some("templates"), &set).unwrap();

    let files: Vec<String> = files
        .iter()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(files, vec!["templates/page.j2"]);
}

#[test]
fn empty_set_never_excludes() {
    let set = PatternSet::new();
    assert!(!set.is_excluded(Path::new("any/thing.bak"), false));
}
