//! Batched template rendering through an external engine process.
//!
//! `stencil-engine` drives a long-lived rendering engine over a
//! newline-delimited JSON protocol on its stdin/stdout. Callers submit
//! batches of [`RenderJob`]s; the crate settles whatever it can without the
//! engine and sends the rest as a single request.
//!
//! ## Pieces
//!
//! | Item | Role |
//! |------|------|
//! | [`classify_string`] / [`classify_file`] | Fast path: content without `{` is its own rendering |
//! | [`resolve_template_path`] | First regular file among the search directories |
//! | [`protocol`] | Request/response frames |
//! | [`EngineChannel`] | Port to the engine; stubbed in tests |
//! | [`Supervisor`] | Owns the engine process, bounded shutdown |
//! | [`Renderer`] | Runs batches over a channel |
//!
//! ## Errors
//!
//! Job-scoped failures ([`JobError`]) are stored on the job. Batch-scoped
//! failures ([`EngineError`]) are returned from the render call; jobs settled
//! on the fast path keep their results either way. Nothing is retried. After
//! a write failure the supervisor is closed and a new one is needed.
//!
//! ## Concurrency
//!
//! One request is in flight per channel. A [`Renderer`] takes `&mut self`
//! for every batch, so sharing one between threads needs external locking.

mod channel;
mod classify;
mod error;
mod job;
mod options;
pub mod protocol;
mod renderer;
mod resolve;
mod supervisor;

pub use channel::EngineChannel;
pub use classify::{
    classify_file, classify_string, is_maybe_template, Classification, TEMPLATE_MARKER,
};
pub use error::{EngineError, JobError};
pub use job::RenderJob;
pub use options::{Options, TraceHook};
pub use protocol::{Command, EngineResult};
pub use renderer::{jobs_from_paths, BatchMode, PendingBatch, Renderer};
pub use resolve::resolve_template_path;
pub use supervisor::{EngineCommand, ProcessState, Supervisor, DEFAULT_SHUTDOWN_GRACE};
