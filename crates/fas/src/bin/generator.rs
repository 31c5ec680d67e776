//! `generator`: search a graph for feedback arc sets and feed them to a
//! running supervisor.
//!
//! No signal handlers are installed: the generator stops when the
//! supervisor clears `active`, and SIGINT/SIGTERM keep their default
//! action. A generator killed inside the ring's critical section is
//! recovered by the supervisor.

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use fas::engine::logging::init_tracing;
use fas::prelude::*;

const PROG: &str = "generator";

#[derive(Parser, Debug)]
#[command(name = PROG, version)]
#[command(about = "Propose feedback arc sets of a graph to the supervisor")]
#[command(after_help = "EXAMPLE: generator 0-1 1-2 1-3 1-4 2-4 3-6 4-3 4-5 6-0")]
struct Cli {
    /// Prefix for the shared memory and semaphore names [default: fas]
    #[arg(long, value_name = "PREFIX")]
    namespace: Option<String>,
    /// Seed for the random vertex orders [default: from OS entropy]
    #[arg(long, value_name = "S")]
    seed: Option<u64>,
    /// Stop after generating this many candidates
    #[arg(long, value_name = "N")]
    iterations: Option<u64>,
    /// Directed edges of the graph, as `u-v`
    #[arg(value_name = "EDGE", required = true, allow_hyphen_values = true)]
    edges: Vec<Edge>,
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
    let graph = Graph::from_edges(cli.edges)?;
    let config = GeneratorConfig {
        names: cli
            .namespace
            .as_deref()
            .map_or(DEFAULT_RESOURCES, ResourceNames::with_prefix),
        seed: cli.seed,
        max_iterations: cli.iterations,
    };

    let generator = Generator::new(config, graph)?;
    let report = generator.run(&AtomicBool::new(false))?;
    tracing::debug!(?report, "generator exiting");
    Ok(())
}
