//! Error types for the rendering gateway.
//!
//! Errors come in two scopes:
//!
//! - [`EngineError`] is batch-scoped. It is returned from a render call and
//!   aborts whatever part of the batch was still waiting on the engine.
//! - [`JobError`] is job-scoped. It is recorded on a single
//!   [`RenderJob`](crate::RenderJob) and never escalates.

use std::io;

use crate::supervisor::ProcessState;

/// Batch-scoped failure.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine process or its pipes could not be created.
    #[error("failed to start template engine `{program}`: {source}")]
    Startup {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to the engine pipes failed.
    ///
    /// A failed write has already closed the owning supervisor.
    #[error("engine I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The engine answered with something that is not a valid response.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The operation is not allowed in the process's current state.
    #[error("cannot {action}: engine process is {state}")]
    InvalidState {
        state: ProcessState,
        action: &'static str,
    },
}

impl EngineError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub(crate) fn invalid_state(state: ProcessState, action: &'static str) -> Self {
        Self::InvalidState { state, action }
    }
}

/// Job-scoped failure, stored on the job it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// A relative template reference was not found in any search directory.
    #[error("absolute path of {template} could not be resolved")]
    Resolution { template: String },

    /// The engine reported a failure for this template; the message is verbatim.
    #[error("{0}")]
    Engine(String),
}
