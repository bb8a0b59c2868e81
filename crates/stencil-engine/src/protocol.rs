//! Wire format of the engine protocol.
//!
//! The engine speaks newline-delimited JSON over its standard input and
//! output. Each request is one object on one line:
//!
//! ```text
//! {"cmd":"render-strings","templates":["Hello {{ name }}"],"opts":{...}}
//! ```
//!
//! and each response is one array on one line, with one entry per submitted
//! template, in submission order:
//!
//! ```text
//! [{"result":"Hello world"},{"error":"'name' is undefined"}]
//! ```
//!
//! The protocol carries no job identifiers, so position is the only way to
//! correlate an entry with the template it answers.

use std::io::{self, BufRead};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, JobError};
use crate::options::Options;

/// Request command understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    /// Templates are inline text.
    RenderStrings,
    /// Templates are resolved file paths.
    RenderFiles,
    /// Ask the engine to shut down; carries no templates.
    Exit,
}

/// One request frame.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub cmd: Command,
    pub templates: &'a [String],
    pub opts: Option<&'a Options>,
}

impl<'a> Request<'a> {
    pub fn render(cmd: Command, templates: &'a [String], opts: &'a Options) -> Self {
        Self {
            cmd,
            templates,
            opts: Some(opts),
        }
    }

    pub fn exit() -> Self {
        Self {
            cmd: Command::Exit,
            templates: &[],
            opts: None,
        }
    }
}

/// One entry of a response array.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EngineResult {
    pub fn success(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(error.into()),
        }
    }

    /// Converts the entry at `index` into a job outcome.
    ///
    /// A `result` takes precedence over an `error`. An entry holding neither
    /// is a protocol violation.
    pub fn into_outcome(self, index: usize) -> Result<Result<String, JobError>, EngineError> {
        match (self.result, self.error) {
            (Some(result), _) => Ok(Ok(result)),
            (None, Some(error)) => Ok(Err(JobError::Engine(error))),
            (None, None) => Err(EngineError::protocol(format!(
                "missing result and error from item at index {index}"
            ))),
        }
    }
}

/// Serializes a request as one JSON object followed by a newline.
pub fn encode_request(request: &Request<'_>) -> Result<Vec<u8>, EngineError> {
    let mut frame = serde_json::to_vec(request)
        .map_err(|err| EngineError::protocol(format!("failed to encode request: {err}")))?;
    frame.push(b'\n');
    Ok(frame)
}

/// Decodes one response line into its ordered entries.
pub fn decode_response(line: &[u8]) -> Result<Vec<EngineResult>, EngineError> {
    serde_json::from_slice(line)
        .map_err(|err| EngineError::protocol(format!("failed to decode response: {err}")))
}

/// Reads one logical line, however long, without its terminator.
///
/// Strips a trailing `\n` or `\r\n`. End of stream before any byte is an
/// [`io::ErrorKind::UnexpectedEof`] error; a final line without terminator
/// is returned as is.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "engine closed its output",
        ));
    }
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(line)
}
