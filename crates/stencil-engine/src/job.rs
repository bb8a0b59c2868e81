//! Units of work submitted in a batch.

use crate::error::JobError;

/// One template to render, plus its outcome once the batch has run.
///
/// The template is inline text for string batches and a file reference for
/// file batches. A job carries at most one outcome: either rendered text or
/// a [`JobError`]. Jobs that already hold an outcome are skipped by later
/// batches, so build fresh jobs for every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    template: String,
    outcome: Option<Result<String, JobError>>,
}

impl RenderJob {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            outcome: None,
        }
    }

    /// The template text or file reference this job was created with.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Rendered output, if the job succeeded.
    pub fn result(&self) -> Option<&str> {
        match &self.outcome {
            Some(Ok(text)) => Some(text),
            _ => None,
        }
    }

    /// Failure, if the job failed.
    pub fn error(&self) -> Option<&JobError> {
        match &self.outcome {
            Some(Err(err)) => Some(err),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&Result<String, JobError>> {
        self.outcome.as_ref()
    }

    pub fn into_outcome(self) -> Option<Result<String, JobError>> {
        self.outcome
    }

    /// Returns `true` once the job holds a result or an error.
    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }

    pub(crate) fn resolve(&mut self, outcome: Result<String, JobError>) {
        debug_assert!(self.outcome.is_none(), "job resolved twice");
        self.outcome = Some(outcome);
    }
}

impl From<&str> for RenderJob {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

impl From<String> for RenderJob {
    fn from(template: String) -> Self {
        Self::new(template)
    }
}
