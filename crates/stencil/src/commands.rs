//! Subcommand implementations.
//!
//! Each command writes rendered output to `out` and per-job failures to
//! `err`, and returns how many jobs failed so `main` can pick the exit code.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use stencil_engine::{jobs_from_paths, EngineChannel, RenderJob, Renderer};
use stencil_ignore::{eligible_files, PatternCollector, PatternSet};

use crate::cli::TreeArgs;

pub fn strings<C, W, E>(
    renderer: &mut Renderer<C>,
    templates: Vec<String>,
    out: &mut W,
    err: &mut E,
) -> anyhow::Result<usize>
where
    C: EngineChannel,
    W: Write,
    E: Write,
{
    let mut jobs: Vec<RenderJob> = templates.into_iter().map(RenderJob::new).collect();
    renderer
        .render_strings(&mut jobs)
        .context("rendering inline templates failed")?;
    report(&jobs, false, out, err)
}

pub fn files<C, W, E>(
    renderer: &mut Renderer<C>,
    search_dirs: Vec<PathBuf>,
    files: Vec<String>,
    out: &mut W,
    err: &mut E,
) -> anyhow::Result<usize>
where
    C: EngineChannel,
    W: Write,
    E: Write,
{
    let mut jobs: Vec<RenderJob> = files.into_iter().map(RenderJob::new).collect();
    renderer
        .render_files_with(&mut jobs, |opts| {
            // Flags come before configured directories.
            let configured = std::mem::take(&mut opts.search_dirs);
            opts.search_dirs = search_dirs;
            opts.search_dirs.extend(configured);
        })
        .context("rendering template files failed")?;
    report(&jobs, jobs.len() > 1, out, err)
}

/// Collects the layered ignore rules for a tree command.
pub fn collect_patterns(
    args: &TreeArgs,
    configured_excludes: &[String],
) -> anyhow::Result<PatternSet> {
    let mut collector = PatternCollector::new(&args.root)
        .excludes(configured_excludes.iter().cloned())
        .excludes(args.excludes.iter().cloned());
    if let Some(subdir) = &args.subdir {
        collector = collector.subdir(subdir);
    }
    collector
        .collect()
        .with_context(|| format!("failed to collect ignore rules under {}", args.root.display()))
}

pub fn eligible<W: Write>(
    args: &TreeArgs,
    configured_excludes: &[String],
    out: &mut W,
) -> anyhow::Result<Vec<PathBuf>> {
    let patterns = collect_patterns(args, configured_excludes)?;
    let files = eligible_files(&args.root, args.subdir.as_deref(), &patterns)
        .with_context(|| format!("failed to walk {}", args.root.display()))?;
    for file in &files {
        writeln!(out, "{}", display_path(file))?;
    }
    Ok(files)
}

pub fn render_tree<C, W, E>(
    renderer: &mut Renderer<C>,
    args: &TreeArgs,
    configured_excludes: &[String],
    out: &mut W,
    err: &mut E,
) -> anyhow::Result<usize>
where
    C: EngineChannel,
    W: Write,
    E: Write,
{
    let patterns = collect_patterns(args, configured_excludes)?;
    let files = eligible_files(&args.root, args.subdir.as_deref(), &patterns)
        .with_context(|| format!("failed to walk {}", args.root.display()))?;

    let mut jobs = jobs_from_paths(&files);
    let root = args.root.clone();
    renderer
        .render_files_with(&mut jobs, |opts| opts.search_dirs.insert(0, root))
        .with_context(|| format!("rendering {} failed", args.root.display()))?;
    report(&jobs, true, out, err)
}

/// Writes each job's outcome; returns the number of failed jobs.
fn report<W: Write, E: Write>(
    jobs: &[RenderJob],
    with_headers: bool,
    out: &mut W,
    err: &mut E,
) -> anyhow::Result<usize> {
    let mut failures = 0;
    for job in jobs {
        match job.outcome() {
            Some(Ok(text)) => {
                if with_headers {
                    writeln!(out, "==> {} <==", job.template())?;
                }
                out.write_all(text.as_bytes())?;
                if !text.ends_with('\n') {
                    writeln!(out)?;
                }
            }
            Some(Err(error)) => {
                failures += 1;
                writeln!(err, "{}: {}", job.template(), error)?;
            }
            None => {
                failures += 1;
                writeln!(err, "{}: not rendered", job.template())?;
            }
        }
    }
    Ok(failures)
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::fs;
    use stencil_engine::{EngineError, Options};
    use tempfile::TempDir;

    /// Answers each template with `<rendered path>`, remembering requests.
    #[derive(Default)]
    struct EchoChannel {
        requests: Vec<Value>,
    }

    impl EngineChannel for EchoChannel {
        fn send(&mut self, frame: &[u8]) -> Result<(), EngineError> {
            self.requests.push(serde_json::from_slice(frame).unwrap());
            Ok(())
        }

        fn receive(&mut self) -> Result<Vec<u8>, EngineError> {
            let request = self.requests.last().unwrap();
            let results: Vec<Value> = request["templates"]
                .as_array()
                .unwrap()
                .iter()
                .map(|t| json!({ "result": format!("<{}>", t.as_str().unwrap()) }))
                .collect();
            Ok(serde_json::to_vec(&results).unwrap())
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn tree_args(root: &Path) -> TreeArgs {
        TreeArgs {
            root: root.to_path_buf(),
            subdir: None,
            excludes: Vec::new(),
        }
    }

    #[test]
    fn test_strings_reports_each_job() {
        let mut renderer = Renderer::new(EchoChannel::default(), Options::new());
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let failures = strings(
            &mut renderer,
            vec!["plain".into(), "{{ x }}".into()],
            &mut out,
            &mut err,
        )
        .unwrap();

        assert_eq!(failures, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "plain\n<{{ x }}>\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_files_counts_resolution_failures() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "static.txt", "static\n");

        let mut renderer = Renderer::new(EchoChannel::default(), Options::new());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let failures = files(
            &mut renderer,
            vec![tmp.path().to_path_buf()],
            vec!["static.txt".into(), "missing.j2".into()],
            &mut out,
            &mut err,
        )
        .unwrap();

        assert_eq!(failures, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "==> static.txt <==\nstatic\n"
        );
        assert!(String::from_utf8(err).unwrap().contains("missing.j2"));
        assert!(renderer.channel().requests.is_empty());
    }

    #[test]
    fn test_flag_search_dirs_come_first() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "flag/page.j2", "{{ flag }}");
        write(tmp.path(), "configured/page.j2", "{{ configured }}");

        let defaults = Options::new().with_search_dir(tmp.path().join("configured"));
        let mut renderer = Renderer::new(EchoChannel::default(), defaults);
        let (mut out, mut err) = (Vec::new(), Vec::new());
        files(
            &mut renderer,
            vec![tmp.path().join("flag")],
            vec!["page.j2".into()],
            &mut out,
            &mut err,
        )
        .unwrap();

        let sent = &renderer.channel().requests[0];
        assert_eq!(
            sent["templates"][0],
            json!(tmp.path().join("flag/page.j2").to_string_lossy())
        );
        assert_eq!(sent["opts"]["searchDirs"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_eligible_lists_unignored_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ".templateignore", "*.bak\n");
        write(tmp.path(), "page.j2", "");
        write(tmp.path(), "old.bak", "");
        write(tmp.path(), "debug.log", "");

        let mut out = Vec::new();
        let listed = eligible(&tree_args(tmp.path()), &["*.log".to_string()], &mut out).unwrap();

        assert_eq!(listed, vec![PathBuf::from("page.j2")]);
        assert_eq!(String::from_utf8(out).unwrap(), "page.j2\n");
    }

    #[test]
    fn test_render_tree_renders_eligible_files_from_root() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ".templateignore", "drafts/\n");
        write(tmp.path(), "drafts/wip.j2", "{{ wip }}");
        write(tmp.path(), "pages/index.j2", "{{ title }}");
        write(tmp.path(), "pages/static.txt", "static");

        let mut renderer = Renderer::new(EchoChannel::default(), Options::new());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut args = tree_args(tmp.path());
        args.subdir = Some("pages".into());

        let failures = render_tree(&mut renderer, &args, &[], &mut out, &mut err).unwrap();
        assert_eq!(failures, 0);

        let index = tmp.path().join("pages/index.j2");
        let expected = format!(
            "==> pages/index.j2 <==\n<{}>\n==> pages/static.txt <==\nstatic\n",
            index.display()
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);

        let sent = &renderer.channel().requests;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["cmd"], json!("render-files"));
        assert_eq!(
            sent[0]["opts"]["searchDirs"][0],
            json!(tmp.path().to_string_lossy())
        );
    }
}
