//! `stencil`: render template batches through an external engine.
//!
//! ```text
//! stencil --engine python3 --engine-arg engine.py strings "Hello {{ name }}"
//! stencil --config stencil.yaml files -s templates index.j2 about.j2
//! stencil eligible site --subdir templates -x '*.log'
//! stencil --config stencil.yaml render-tree site
//! ```
//!
//! Exit status is 0 when every job rendered, 1 when any job failed and 2
//! when the run itself failed (bad config, engine crash, protocol error).

mod cli;
mod commands;
mod config;
mod logging;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;
use stencil_engine::{Options, Renderer, Supervisor};
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::config::Config;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("stencil: {err:#}");
    }

    match run(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            debug!(failures, "some jobs failed");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("stencil: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<usize> {
    let config = Config::for_cli(&cli)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut err = io::stderr();

    // Listing needs no engine.
    if let Commands::Eligible(args) = &cli.command {
        commands::eligible(args, &config.exclude, &mut out)?;
        return Ok(0);
    }

    let mut renderer = renderer_for(&cli, &config)?;
    let failures = match cli.command {
        Commands::Strings { templates } => {
            commands::strings(&mut renderer, templates, &mut out, &mut err)?
        }
        Commands::Files { search_dirs, files } => {
            commands::files(&mut renderer, search_dirs, files, &mut out, &mut err)?
        }
        Commands::RenderTree(args) => {
            commands::render_tree(&mut renderer, &args, &config.exclude, &mut out, &mut err)?
        }
        Commands::Eligible(_) => 0,
    };
    renderer.close();
    out.flush()?;
    Ok(failures)
}

/// Builds a renderer whose engine starts on the first batch that needs it.
fn renderer_for(cli: &Cli, config: &Config) -> anyhow::Result<Renderer<Supervisor>> {
    let command = config.engine_command(cli)?;
    let supervisor = Supervisor::new(command).with_shutdown_grace(config.shutdown_grace());

    let mut defaults: Options = config.options.clone();
    if cli.trace {
        defaults = defaults
            .with_trace_send(|payload: &Value| eprintln!("--> {payload}"))
            .with_trace_receive(|payload: &Value| eprintln!("<-- {payload}"));
    }
    Ok(Renderer::new(supervisor, defaults))
}
