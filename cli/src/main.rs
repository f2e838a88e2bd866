//! `domdebug`: replays DOM mutation and protocol traces against the DOM
//! breakpoint core.
//!
//! Every protocol response and every pause is printed to stdout as one JSON
//! line. Pauses resume immediately. Logs go to stderr; the level comes from
//! `--log-level` or the `DOMDEBUG_LOG` environment variable.

mod replay;
mod trace;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use domdebug_engine::{DebuggerConfig, DomDebugger};
use log::{LevelFilter, info};
use simple_logger::SimpleLogger;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

#[derive(Debug, Parser)]
#[command(name = "domdebug")]
#[command(
    author,
    version,
    about = "DOM, event listener and XHR breakpoints for script debuggers"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replay a JSON trace of DOM mutations, requests, events and protocol
    /// commands
    Replay {
        /// Trace file
        #[arg(value_name = "TRACE")]
        trace: PathBuf,

        /// URL of the inspected document, overriding the trace and config
        #[arg(long)]
        url: Option<String>,

        /// Persist sticky breakpoints to this JSON file
        #[arg(long, value_name = "PATH")]
        store: Option<PathBuf>,

        /// Debugger configuration file (JSON)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Log level (off, error, warn, info, debug, trace)
        #[arg(long, env = "DOMDEBUG_LOG", default_value = "warn")]
        log_level: LevelFilter,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    match Cli::parse().command {
        Commands::Replay {
            trace,
            url,
            store,
            config,
            log_level,
        } => {
            SimpleLogger::new().with_level(log_level).init()?;
            run_replay(&trace, url, store, config)
        }
    }
}

fn run_replay(
    trace_path: &Path,
    url: Option<String>,
    store: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let text = fs::read_to_string(trace_path)
        .wrap_err_with(|| format!("could not read trace {}", trace_path.display()))?;
    let trace: trace::Trace = serde_json::from_str(&text)
        .wrap_err_with(|| format!("could not parse trace {}", trace_path.display()))?;

    let mut config = match config_path {
        Some(path) => DebuggerConfig::load(path)?,
        None => DebuggerConfig::default(),
    };
    if let Some(url) = url.or_else(|| trace.url.clone()) {
        config.inspected_url = url;
    }
    if let Some(store) = store {
        config.store_path = Some(store);
    }
    info!("replaying {} for {}", trace_path.display(), config.inspected_url);

    let debugger = DomDebugger::from_config(config)?;
    let stdout = io::stdout();
    let mut replayer = replay::Replayer::new(debugger, &trace, stdout.lock())?;
    replayer.run(trace.steps)?;

    let registry = replayer.debugger().registry();
    info!(
        "finished with {} nodes carrying DOM breakpoint state",
        registry.tracked_node_count()
    );
    Ok(())
}
