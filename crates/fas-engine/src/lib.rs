//! Supervisor and generator loops for the feedback arc set search.
//!
//! A [`Supervisor`] owns the shared ring, drains candidate sets from it
//! and keeps the smallest one seen; any number of [`Generator`]s attach to
//! the ring, search the graph with random vertex orders and push what they
//! find. The supervisor stops on a signal, an acyclicity proof or a
//! solution limit, and tells the generators to stop through the ring's
//! `active` flag. Generators also honour a caller-supplied stop flag.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod signals;
pub mod supervisor;

pub use config::{ConfigError, GeneratorConfig, SupervisorConfig, DEFAULT_POLL_INTERVAL};
pub use error::EngineError;
pub use generator::{Generator, GeneratorReport, GeneratorStop};
pub use supervisor::{
    Observation, SearchOutcome, SolutionTracker, StopReason, Supervisor, SupervisorReport,
};
