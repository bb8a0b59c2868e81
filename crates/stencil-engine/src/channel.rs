//! The port between the batch codec and whatever runs the templates.

use crate::error::EngineError;

/// A request/response channel to a template engine.
///
/// One call to [`send`](Self::send) is answered by exactly one call to
/// [`receive`](Self::receive). Implementations are not expected to
/// interleave batches; callers serialize access to a channel.
///
/// [`Supervisor`](crate::Supervisor) implements this over a child process.
/// Tests implement it in memory.
pub trait EngineChannel {
    /// Sends one encoded request frame, terminator included.
    fn send(&mut self, frame: &[u8]) -> Result<(), EngineError>;

    /// Receives one response line, terminator stripped.
    fn receive(&mut self) -> Result<Vec<u8>, EngineError>;

    /// Releases the engine. Must be idempotent.
    fn close(&mut self) {}
}

impl<C: EngineChannel + ?Sized> EngineChannel for &mut C {
    fn send(&mut self, frame: &[u8]) -> Result<(), EngineError> {
        (**self).send(frame)
    }

    fn receive(&mut self) -> Result<Vec<u8>, EngineError> {
        (**self).receive()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<C: EngineChannel + ?Sized> EngineChannel for Box<C> {
    fn send(&mut self, frame: &[u8]) -> Result<(), EngineError> {
        (**self).send(frame)
    }

    fn receive(&mut self) -> Result<Vec<u8>, EngineError> {
        (**self).receive()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
