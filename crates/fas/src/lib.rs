//! Minimum feedback arc set search by cooperating processes.
//!
//! One `supervisor` process creates a shared-memory ring and keeps the
//! smallest feedback arc set it has seen; any number of `generator`
//! processes attach to it, each proposing candidates from random vertex
//! orders of the same graph. This facade re-exports the sub-crates.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use fas::prelude::*;
//!
//! // Supervisor process.
//! let mut supervisor = Supervisor::new(SupervisorConfig::default())?;
//! let report = supervisor.run(&AtomicBool::new(false), &mut std::io::stdout())?;
//! println!("{:?}", report.outcome);
//!
//! // Generator process.
//! let graph = Graph::parse(["0-1", "1-2", "2-0"])?;
//! let generator = Generator::new(GeneratorConfig::default(), graph)?;
//! generator.run(&AtomicBool::new(false))?;
//! # Ok::<(), EngineError>(())
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `fas-core` | `Edge`, `FasSlot`, resource names |
//! | [`shm`] | `fas-shm` | Shared region, named semaphores, ring protocol |
//! | [`graph`] | `fas-graph` | Graph model and randomized candidate search |
//! | [`engine`] | `fas-engine` | Supervisor and generator loops, config, signals |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Values shared by both roles (`fas-core`).
pub use fas_core as types;

/// Shared-memory ring (`fas-shm`).
///
/// [`shm::RingConsumer`] is the supervisor's end, [`shm::RingProducer`]
/// the generators'.
pub use fas_shm as shm;

/// Graph model and candidate search (`fas-graph`).
pub use fas_graph as graph;

/// Supervisor and generator loops (`fas-engine`).
pub use fas_engine as engine;

/// Common imports for writing a supervisor or generator.
pub mod prelude {
    pub use fas_core::{Edge, FasSlot, ResourceNames, DEFAULT_RESOURCES, MAX_FAS_LEN};
    pub use fas_engine::{
        EngineError, Generator, GeneratorConfig, GeneratorReport, SearchOutcome, StopReason,
        Supervisor, SupervisorConfig, SupervisorReport,
    };
    pub use fas_graph::{FasSearcher, Graph, GraphError};
    pub use fas_shm::{RingConfig, ShmError, DEFAULT_CAPACITY};
}
