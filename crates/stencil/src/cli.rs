//! Command-line interface definition.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Render template batches through an external engine process.
#[derive(Debug, Parser)]
#[command(name = "stencil", version, about)]
pub struct Cli {
    /// YAML config file with the engine command and default options.
    #[arg(long, global = true, env = "STENCIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Engine program; overrides the config file.
    #[arg(long, global = true, env = "STENCIL_ENGINE")]
    pub engine: Option<String>,

    /// Argument passed to the engine program (repeatable).
    #[arg(long = "engine-arg", global = true, allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Print raw protocol payloads to stderr.
    #[arg(long, global = true)]
    pub trace: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render inline templates.
    Strings {
        #[arg(required = true)]
        templates: Vec<String>,
    },

    /// Render template files found in the search directories.
    Files {
        /// Directory searched for relative template paths (repeatable, in order).
        #[arg(short = 's', long = "search-dir")]
        search_dirs: Vec<PathBuf>,

        #[arg(required = true)]
        files: Vec<String>,
    },

    /// List files under a tree that are eligible for rendering.
    Eligible(TreeArgs),

    /// Render every eligible file under a tree in one batch.
    RenderTree(TreeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TreeArgs {
    /// Ignore root.
    pub root: PathBuf,

    /// Slash-separated directory below the root to restrict to.
    #[arg(long)]
    pub subdir: Option<String>,

    /// Extra exclusion pattern with the highest priority (repeatable).
    #[arg(short = 'x', long = "exclude")]
    pub excludes: Vec<String>,
}
