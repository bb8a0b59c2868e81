//! Lifecycle of the external engine process.
//!
//! A [`Supervisor`] owns exactly one engine process together with its stdin
//! and stdout pipes. Stderr is inherited so the engine's diagnostics reach
//! the host's error stream.
//!
//! ```text
//! NotStarted ──start()──▶ Running ──close()──▶ Closing ──▶ Closed
//!      │                                                     ▲
//!      └──────────────────────close()────────────────────────┘
//! ```
//!
//! There is no restart. A failed write closes the supervisor; after that
//! (or after any fatal protocol error) the caller builds a new one.
//!
//! Shutdown is bounded: [`Supervisor::close`] sends an `exit` frame, closes
//! both pipes and waits for the process for at most the grace period
//! (5 seconds by default) before killing it. The grace period covers the
//! exit frame write too, so an engine that stopped reading its input cannot
//! stall `close`.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::channel::EngineChannel;
use crate::error::EngineError;
use crate::protocol::{self, Request};

/// How long [`Supervisor::close`] waits for the engine before killing it.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle state of an engine process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Running,
    Closing,
    Closed,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::NotStarted => "not started",
            ProcessState::Running => "running",
            ProcessState::Closing => "closing",
            ProcessState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Program and arguments that launch the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the engine process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub current_dir: Option<PathBuf>,
}

impl EngineCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// Owner of one engine process and its pipes.
pub struct Supervisor {
    command: EngineCommand,
    shutdown_grace: Duration,
    process: Process,
}

enum Process {
    NotStarted,
    Running(RunningEngine),
    Closing,
    Closed,
}

impl Process {
    fn state(&self) -> ProcessState {
        match self {
            Process::NotStarted => ProcessState::NotStarted,
            Process::Running(_) => ProcessState::Running,
            Process::Closing => ProcessState::Closing,
            Process::Closed => ProcessState::Closed,
        }
    }
}

impl Supervisor {
    /// Creates a supervisor; the engine is spawned by [`start`](Self::start)
    /// or by the first request, whichever comes first.
    pub fn new(command: EngineCommand) -> Self {
        Self {
            command,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            process: Process::NotStarted,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn command(&self) -> &EngineCommand {
        &self.command
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    pub fn state(&self) -> ProcessState {
        self.process.state()
    }

    /// OS process id of the running engine.
    pub fn pid(&self) -> Option<u32> {
        match &self.process {
            Process::Running(engine) => Some(engine.child.id()),
            _ => None,
        }
    }

    /// Spawns the engine with piped stdin/stdout and inherited stderr.
    ///
    /// Only valid from [`ProcessState::NotStarted`]. On failure nothing is
    /// left running and the state is unchanged.
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.state() {
            ProcessState::NotStarted => {}
            state => return Err(EngineError::invalid_state(state, "start the engine")),
        }

        let engine = RunningEngine::spawn(&self.command)?;
        debug!(
            program = %self.command.program,
            pid = engine.child.id(),
            "started template engine"
        );
        self.process = Process::Running(engine);
        Ok(())
    }

    /// Shuts the engine down and releases every handle.
    ///
    /// Sends a best-effort `exit` frame, closes stdin then stdout, and waits
    /// for the process for at most the grace period before killing it.
    /// Calling this again, or on a supervisor that never started, is a no-op.
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.process, Process::Closing) {
            Process::Running(engine) => engine.shutdown(self.shutdown_grace),
            Process::NotStarted | Process::Closing | Process::Closed => {}
        }
        self.process = Process::Closed;
    }
}

impl EngineChannel for Supervisor {
    fn send(&mut self, frame: &[u8]) -> Result<(), EngineError> {
        if self.state() == ProcessState::NotStarted {
            self.start()?;
        }

        let written = match &mut self.process {
            Process::Running(engine) => engine.write_frame(frame),
            other => return Err(EngineError::invalid_state(other.state(), "send a request")),
        };
        if let Err(err) = written {
            warn!(error = %err, "writing to template engine failed, closing it");
            self.close();
            return Err(EngineError::Io(err));
        }

        debug!(bytes = frame.len(), "sent request frame");
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>, EngineError> {
        let line = match &mut self.process {
            Process::Running(engine) => engine.read_frame()?,
            other => return Err(EngineError::invalid_state(other.state(), "read a response")),
        };
        debug!(bytes = line.len(), "received response line");
        Ok(line)
    }

    fn close(&mut self) {
        Supervisor::close(self);
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("command", &self.command)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("state", &self.state())
            .field("pid", &self.pid())
            .finish()
    }
}

struct RunningEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl RunningEngine {
    fn spawn(command: &EngineCommand) -> Result<Self, EngineError> {
        let startup = |source: io::Error| EngineError::Startup {
            program: command.program.clone(),
            source,
        };

        let mut child = command
            .to_command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(startup)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            kill_and_reap(&mut child);
            return Err(startup(io::Error::other("engine pipes were not created")));
        };

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.stdin.write_all(frame)?;
        self.stdin.flush()
    }

    fn read_frame(&mut self) -> io::Result<Vec<u8>> {
        protocol::read_line(&mut self.stdout)
    }

    /// Tears the engine down within `grace`.
    ///
    /// The exit frame is written from a helper thread: an engine that stopped
    /// reading may leave its stdin pipe full, and the write must not delay
    /// the kill.
    fn shutdown(self, grace: Duration) {
        let RunningEngine {
            mut child,
            stdin,
            stdout,
        } = self;
        let pid = child.id();
        let deadline = Instant::now() + grace;

        let writer = match thread::Builder::new()
            .name("stencil-engine-exit".into())
            .spawn(move || send_exit_frame(stdin))
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                debug!(pid, error = %err, "could not spawn exit frame writer");
                None
            }
        };
        drop(stdout);

        let remaining = deadline.saturating_duration_since(Instant::now());
        match child.wait_timeout(remaining) {
            Ok(Some(status)) => debug!(pid, %status, "template engine exited"),
            Ok(None) => {
                warn!(pid, grace = ?grace, "template engine did not exit in time, killing it");
                kill_and_reap(&mut child);
            }
            Err(err) => {
                warn!(pid, error = %err, "waiting for template engine failed, killing it");
                kill_and_reap(&mut child);
            }
        }

        // A writer still blocked here is held up by another process sharing
        // the pipe; it is left to finish on its own.
        if let Some(writer) = writer {
            if writer.is_finished() {
                let _ = writer.join();
            }
        }
    }
}

/// Best effort: the engine may already be gone. Dropping `stdin` closes it.
fn send_exit_frame(mut stdin: ChildStdin) {
    if let Ok(frame) = protocol::encode_request(&Request::exit()) {
        let _ = stdin.write_all(&frame).and_then(|()| stdin.flush());
    }
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
