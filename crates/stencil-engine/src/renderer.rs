//! Batch rendering over an [`EngineChannel`].
//!
//! A [`Renderer`] turns a slice of [`RenderJob`]s into at most one request
//! to the engine:
//!
//! 1. Clone the default [`Options`] and apply the caller's overrides.
//! 2. For file batches, resolve each reference against the search
//!    directories. Unresolvable jobs get a [`JobError::Resolution`].
//! 3. Classify each remaining template. Literal content becomes the job's
//!    result on the spot.
//! 4. Send whatever is left as one request and read one response line.
//! 5. Hand response entry *i* to forwarded job *i*.
//!
//! Steps 2 and 3 record which job each forwarded template came from in a
//! [`PendingBatch`], built once, so step 5 never has to recompute the
//! filtering. If nothing is left after step 3 the engine is not contacted.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::channel::EngineChannel;
use crate::classify::{classify_file, classify_string, Classification};
use crate::error::{EngineError, JobError};
use crate::job::RenderJob;
use crate::options::{Options, TraceHook};
use crate::protocol::{decode_response, encode_request, Command, EngineResult, Request};
use crate::resolve::resolve_template_path;
use crate::supervisor::{EngineCommand, Supervisor};

/// What the templates of a batch are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Inline template text.
    Strings,
    /// File references, resolved against the search directories.
    Files,
}

impl BatchMode {
    pub fn command(self) -> Command {
        match self {
            BatchMode::Strings => Command::RenderStrings,
            BatchMode::Files => Command::RenderFiles,
        }
    }
}

/// Templates forwarded to the engine, paired with the jobs they belong to.
///
/// `templates[i]` was taken from `jobs[slots[i]]`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingBatch {
    templates: Vec<String>,
    slots: Vec<usize>,
}

impl PendingBatch {
    /// Resolves and classifies `jobs`, settling every job that does not need
    /// the engine and collecting the rest.
    ///
    /// Jobs that already hold an outcome are left alone.
    pub fn prepare(mode: BatchMode, jobs: &mut [RenderJob], opts: &Options) -> Self {
        let mut batch = Self::default();

        for (index, job) in jobs.iter_mut().enumerate() {
            if job.is_resolved() {
                continue;
            }

            let (template, classified) = match mode {
                BatchMode::Strings => (
                    job.template().to_string(),
                    Ok(classify_string(job.template())),
                ),
                BatchMode::Files => {
                    let Some(path) = resolve_template_path(job.template(), &opts.search_dirs) else {
                        job.resolve(Err(JobError::Resolution {
                            template: job.template().to_string(),
                        }));
                        continue;
                    };
                    let classified = classify_file(&path);
                    (path.to_string_lossy().into_owned(), classified)
                }
            };

            match classified {
                Ok(Classification::Literal(text)) => {
                    job.resolve(Ok(text));
                    continue;
                }
                Ok(Classification::MaybeTemplate) => {}
                Err(err) => warn!(
                    path = %template,
                    error = %err,
                    "could not inspect template file, leaving it to the engine"
                ),
            }

            batch.templates.push(template);
            batch.slots.push(index);
        }

        batch
    }

    /// Templates to send, in job order.
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Index into the job slice for each forwarded template.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Distributes response entries onto the forwarded jobs.
    ///
    /// The whole response is validated before any job is touched, so a bad
    /// entry leaves every forwarded job unresolved. Jobs settled during
    /// [`prepare`](Self::prepare) keep their outcomes either way.
    pub fn apply(
        &self,
        jobs: &mut [RenderJob],
        results: Vec<EngineResult>,
    ) -> Result<(), EngineError> {
        if results.len() != self.slots.len() {
            return Err(EngineError::protocol(format!(
                "engine returned {} results for {} templates",
                results.len(),
                self.slots.len()
            )));
        }

        let outcomes = results
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_outcome(index))
            .collect::<Result<Vec<_>, _>>()?;

        for (&slot, outcome) in self.slots.iter().zip(outcomes) {
            jobs[slot].resolve(outcome);
        }
        Ok(())
    }
}

/// Batch front end over an engine channel.
///
/// Holds the process-wide default [`Options`]; every batch works on a fresh
/// clone of them. A renderer sends one batch at a time, so callers sharing
/// one across threads must serialize access.
///
/// # Example
///
/// ```rust,ignore
/// use stencil_engine::{EngineCommand, Options, Renderer, RenderJob};
///
/// let mut renderer = Renderer::spawn(
///     EngineCommand::new("python3").arg("engine/main.py"),
///     Options::new().with_search_dir("templates"),
/// )?;
///
/// let mut jobs = vec![RenderJob::new("Hello {{ name }}"), RenderJob::new("static")];
/// renderer.render_strings_with(&mut jobs, |opts| {
///     opts.globals.insert("name".into(), "world".into());
/// })?;
/// assert_eq!(jobs[1].result(), Some("static"));
/// ```
#[derive(Debug)]
pub struct Renderer<C = Supervisor> {
    channel: C,
    defaults: Options,
}

impl Renderer<Supervisor> {
    /// Starts an engine process and wraps it in a renderer.
    pub fn spawn(command: EngineCommand, defaults: Options) -> Result<Self, EngineError> {
        let mut supervisor = Supervisor::new(command);
        supervisor.start()?;
        Ok(Self::new(supervisor, defaults))
    }
}

impl<C: EngineChannel> Renderer<C> {
    pub fn new(channel: C, defaults: Options) -> Self {
        Self { channel, defaults }
    }

    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    pub fn defaults_mut(&mut self) -> &mut Options {
        &mut self.defaults
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Renders inline templates with the default options.
    pub fn render_strings(&mut self, jobs: &mut [RenderJob]) -> Result<(), EngineError> {
        self.render(BatchMode::Strings, jobs, |_| {})
    }

    /// Renders inline templates with per-batch overrides.
    pub fn render_strings_with<F>(
        &mut self,
        jobs: &mut [RenderJob],
        overrides: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Options),
    {
        self.render(BatchMode::Strings, jobs, overrides)
    }

    /// Renders template files with the default options.
    pub fn render_files(&mut self, jobs: &mut [RenderJob]) -> Result<(), EngineError> {
        self.render(BatchMode::Files, jobs, |_| {})
    }

    /// Renders template files with per-batch overrides.
    pub fn render_files_with<F>(
        &mut self,
        jobs: &mut [RenderJob],
        overrides: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Options),
    {
        self.render(BatchMode::Files, jobs, overrides)
    }

    /// Runs one batch.
    ///
    /// On `Ok`, every job holds a result or an error. On `Err`, jobs settled
    /// without the engine keep their outcomes and forwarded jobs stay
    /// unresolved.
    pub fn render<F>(
        &mut self,
        mode: BatchMode,
        jobs: &mut [RenderJob],
        overrides: F,
    ) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Options),
    {
        let mut opts = self.defaults.clone();
        overrides(&mut opts);

        let batch = PendingBatch::prepare(mode, jobs, &opts);
        if batch.is_empty() {
            debug!(jobs = jobs.len(), "every job settled without the engine");
            return Ok(());
        }
        debug!(
            jobs = jobs.len(),
            forwarded = batch.len(),
            cmd = ?mode.command(),
            "sending batch to engine"
        );

        let request = Request::render(mode.command(), batch.templates(), &opts);
        let frame = match encode_request(&request) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "encoding request failed, closing engine channel");
                self.channel.close();
                return Err(err);
            }
        };
        trace_payload(opts.trace_send(), &frame);
        self.channel.send(&frame)?;

        let line = self.channel.receive()?;
        trace_payload(opts.trace_receive(), &line);

        let results = decode_response(&line)?;
        batch.apply(jobs, results)
    }

    /// Closes the underlying channel. Idempotent.
    pub fn close(&mut self) {
        self.channel.close();
    }
}

fn trace_payload(hook: Option<&TraceHook>, payload: &[u8]) {
    if let Some(hook) = hook {
        if let Ok(value) = serde_json::from_slice::<Value>(payload) {
            hook(&value);
        }
    }
}

/// Convenience for callers that hold file paths rather than strings.
pub fn jobs_from_paths<I, P>(paths: I) -> Vec<RenderJob>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .map(|path| RenderJob::new(path.as_ref().to_string_lossy().into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_strings_keeps_only_possible_templates() {
        let mut jobs = vec![
            RenderJob::new("plain"),
            RenderJob::new("{{ a }}"),
            RenderJob::new("also plain"),
            RenderJob::new("{% b %}"),
        ];
        let batch = PendingBatch::prepare(BatchMode::Strings, &mut jobs, &Options::new());

        assert_eq!(batch.templates(), ["{{ a }}", "{% b %}"]);
        assert_eq!(batch.slots(), [1, 3]);
        assert_eq!(jobs[0].result(), Some("plain"));
        assert_eq!(jobs[2].result(), Some("also plain"));
        assert!(!jobs[1].is_resolved());
    }

    #[test]
    fn test_prepare_files_resolves_then_classifies() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("literal.txt"), "no braces").unwrap();
        fs::write(tmp.path().join("page.j2"), "{{ title }}").unwrap();

        let mut jobs = vec![
            RenderJob::new("literal.txt"),
            RenderJob::new("missing.j2"),
            RenderJob::new("page.j2"),
        ];
        let opts = Options::new().with_search_dir(tmp.path());
        let batch = PendingBatch::prepare(BatchMode::Files, &mut jobs, &opts);

        assert_eq!(jobs[0].result(), Some("no braces"));
        assert_eq!(
            jobs[1].error(),
            Some(&JobError::Resolution {
                template: "missing.j2".into()
            })
        );
        assert_eq!(batch.slots(), [2]);
        assert_eq!(
            batch.templates(),
            [tmp.path().join("page.j2").to_string_lossy().into_owned()]
        );
    }

    #[test]
    fn test_prepare_skips_settled_jobs() {
        let mut settled = RenderJob::new("{{ x }}");
        settled.resolve(Ok("done".into()));
        let mut jobs = vec![settled, RenderJob::new("{{ y }}")];

        let batch = PendingBatch::prepare(BatchMode::Strings, &mut jobs, &Options::new());
        assert_eq!(batch.slots(), [1]);
        assert_eq!(jobs[0].result(), Some("done"));
    }

    #[test]
    fn test_apply_maps_positionally() {
        let mut jobs = vec![
            RenderJob::new("{{ a }}"),
            RenderJob::new("plain"),
            RenderJob::new("{{ b }}"),
        ];
        let batch = PendingBatch::prepare(BatchMode::Strings, &mut jobs, &Options::new());
        batch
            .apply(
                &mut jobs,
                vec![EngineResult::success("A"), EngineResult::failure("b failed")],
            )
            .unwrap();

        assert_eq!(jobs[0].result(), Some("A"));
        assert_eq!(jobs[1].result(), Some("plain"));
        assert_eq!(jobs[2].error(), Some(&JobError::Engine("b failed".into())));
    }

    #[test]
    fn test_apply_rejects_wrong_arity() {
        let mut jobs = vec![RenderJob::new("{{ a }}"), RenderJob::new("{{ b }}")];
        let batch = PendingBatch::prepare(BatchMode::Strings, &mut jobs, &Options::new());

        let err = batch
            .apply(&mut jobs, vec![EngineResult::success("A")])
            .unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
        assert!(jobs.iter().all(|job| !job.is_resolved()));
    }

    #[test]
    fn test_apply_rejects_empty_entry_without_partial_writes() {
        let mut jobs = vec![
            RenderJob::new("plain"),
            RenderJob::new("{{ a }}"),
            RenderJob::new("{{ b }}"),
        ];
        let batch = PendingBatch::prepare(BatchMode::Strings, &mut jobs, &Options::new());

        let err = batch
            .apply(&mut jobs, vec![EngineResult::success("A"), EngineResult::default()])
            .unwrap_err();
        assert!(err.to_string().contains("index 1"));
        assert_eq!(jobs[0].result(), Some("plain"));
        assert!(!jobs[1].is_resolved());
        assert!(!jobs[2].is_resolved());
    }

    #[test]
    fn test_jobs_from_paths() {
        let jobs = jobs_from_paths(["a.j2", "dir/b.j2"]);
        assert_eq!(jobs[0].template(), "a.j2");
        assert_eq!(jobs[1].template(), "dir/b.j2");
    }
}
