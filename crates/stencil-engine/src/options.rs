//! Per-batch engine options.
//!
//! [`Options`] is the settings snapshot sent with every render request. A
//! [`Renderer`](crate::Renderer) keeps one instance as its defaults and
//! clones it for each batch before applying the caller's overrides, so
//! overrides never leak into later batches.
//!
//! Serialized field names are camelCase because that is what the engine
//! reads (`searchDirs`, `trimBlocks`, ...). The trace hooks are local only
//! and never serialized.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Diagnostic hook receiving a decoded protocol payload.
pub type TraceHook = Arc<dyn Fn(&Value) + Send + Sync>;

/// Engine-tunable settings for one batch.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Directories searched, in order, for relative template references.
    pub search_dirs: Vec<PathBuf>,
    pub trim_blocks: bool,
    pub lstrip_blocks: bool,
    /// Render undefined variables as empty instead of failing.
    pub non_strict: bool,
    pub debug_trace: bool,
    /// Global variables visible to every template.
    pub globals: Map<String, Value>,
    /// Engine extensions to load, by name.
    pub extensions: Vec<String>,
    /// Custom filters: filter name (optionally `name:function`) to source code.
    pub filters: BTreeMap<String, String>,

    #[serde(skip)]
    trace_send: Option<TraceHook>,
    #[serde(skip)]
    trace_receive: Option<TraceHook>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    pub fn with_trim_blocks(mut self, enabled: bool) -> Self {
        self.trim_blocks = enabled;
        self
    }

    pub fn with_lstrip_blocks(mut self, enabled: bool) -> Self {
        self.lstrip_blocks = enabled;
        self
    }

    pub fn with_non_strict(mut self, enabled: bool) -> Self {
        self.non_strict = enabled;
        self
    }

    pub fn with_debug_trace(mut self, enabled: bool) -> Self {
        self.debug_trace = enabled;
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extensions.push(extension.into());
        self
    }

    pub fn with_filter(mut self, name: impl Into<String>, code: impl Into<String>) -> Self {
        self.filters.insert(name.into(), code.into());
        self
    }

    /// Hook called with every outbound request, decoded back into JSON.
    pub fn with_trace_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.trace_send = Some(Arc::new(hook));
        self
    }

    /// Hook called with every inbound response, decoded as JSON.
    pub fn with_trace_receive<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.trace_receive = Some(Arc::new(hook));
        self
    }

    pub fn set_trace_send(&mut self, hook: Option<TraceHook>) {
        self.trace_send = hook;
    }

    pub fn set_trace_receive(&mut self, hook: Option<TraceHook>) {
        self.trace_receive = hook;
    }

    pub fn trace_send(&self) -> Option<&TraceHook> {
        self.trace_send.as_ref()
    }

    pub fn trace_receive(&self) -> Option<&TraceHook> {
        self.trace_receive.as_ref()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("search_dirs", &self.search_dirs)
            .field("trim_blocks", &self.trim_blocks)
            .field("lstrip_blocks", &self.lstrip_blocks)
            .field("non_strict", &self.non_strict)
            .field("debug_trace", &self.debug_trace)
            .field("globals", &self.globals)
            .field("extensions", &self.extensions)
            .field("filters", &self.filters)
            .field("trace_send", &self.trace_send.is_some())
            .field("trace_receive", &self.trace_receive.is_some())
            .finish()
    }
}
