//! `supervisor`: create the ring, collect candidates, report the best.
//!
//! Runs until the graph is proven acyclic, the solution limit is reached,
//! or SIGINT/SIGTERM arrives; then clears `active`, wakes blocked
//! generators and removes the shared memory object and semaphores.

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use fas::engine::logging::init_tracing;
use fas::engine::signals::install_stop_handlers;
use fas::prelude::*;

const PROG: &str = "supervisor";

#[derive(Parser, Debug)]
#[command(name = PROG, version)]
#[command(about = "Collect feedback arc set candidates from generators and keep the smallest")]
struct Cli {
    /// Prefix for the shared memory and semaphore names [default: fas]
    #[arg(long, value_name = "PREFIX")]
    namespace: Option<String>,
    /// Number of ring slots
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CAPACITY)]
    capacity: u32,
    /// Stop after reading this many solutions
    #[arg(long, value_name = "N")]
    limit: Option<u64>,
    /// Longest single wait on an empty ring, in milliseconds
    #[arg(long = "poll-ms", value_name = "MS", default_value_t = 1000)]
    poll_ms: u64,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[{PROG}] {} failed: {e}", e.operation());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), EngineError> {
    let names = cli
        .namespace
        .as_deref()
        .map_or(DEFAULT_RESOURCES, ResourceNames::with_prefix);
    let config = SupervisorConfig {
        ring: RingConfig::new(names).with_capacity(cli.capacity),
        solution_limit: cli.limit,
        poll_interval: Duration::from_millis(cli.poll_ms),
    };

    // Handlers first: a signal must never kill us while the ring exists.
    let stop = install_stop_handlers().map_err(EngineError::Signal)?;
    let mut supervisor = Supervisor::new(config)?;
    let report = supervisor.run(stop, &mut io::stdout().lock())?;
    tracing::debug!(?report, "supervisor exiting");
    Ok(())
}
