//! Config file loading.
//!
//! The config file is YAML. Every key is optional:
//!
//! ```yaml
//! engine:
//!   program: python3
//!   args: [engine/main.py]
//!   env:
//!     PYTHONUNBUFFERED: "1"
//! shutdown_grace_ms: 2000
//! exclude: ["*.log"]
//! options:
//!   searchDirs: [templates, shared]
//!   trimBlocks: true
//!   globals:
//!     site: docs
//! ```
//!
//! Command-line flags win over file values.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use stencil_engine::{EngineCommand, Options, DEFAULT_SHUTDOWN_GRACE};

use crate::cli::Cli;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub engine: Option<EngineCommand>,
    pub shutdown_grace_ms: Option<u64>,
    /// Exclusions applied to every tree command, before `--exclude` flags.
    pub exclude: Vec<String>,
    pub options: Options,
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Loads the file named on the command line, or the empty config.
    pub fn for_cli(cli: &Cli) -> anyhow::Result<Self> {
        match &cli.config {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Engine command after applying `--engine` and `--engine-arg`.
    ///
    /// `--engine` replaces the configured program and its arguments;
    /// `--engine-arg` values are appended either way.
    pub fn engine_command(&self, cli: &Cli) -> anyhow::Result<EngineCommand> {
        let base = match (&cli.engine, &self.engine) {
            (Some(program), _) => EngineCommand::new(program.as_str()),
            (None, Some(configured)) => configured.clone(),
            (None, None) => bail!("no template engine configured (use --engine or STENCIL_ENGINE)"),
        };
        Ok(base.args(cli.engine_args.iter().cloned()))
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SHUTDOWN_GRACE)
    }
}
