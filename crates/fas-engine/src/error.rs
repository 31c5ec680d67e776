//! Top-level error for the supervisor and generator loops.

use std::error::Error;
use std::fmt;
use std::io;

use fas_graph::GraphError;
use fas_shm::ShmError;
use nix::errno::Errno;

use crate::config::ConfigError;

/// Anything that ends a supervisor or generator run abnormally.
#[derive(Debug)]
pub enum EngineError {
    /// Invalid configuration.
    Config(ConfigError),
    /// Shared region or semaphore failure, including a corrupted slot.
    Shm(ShmError),
    /// The edge list could not be turned into a graph.
    Graph(GraphError),
    /// Installing the stop-signal handlers failed.
    Signal(Errno),
    /// Writing results to the output stream failed.
    Output(io::Error),
}

impl EngineError {
    /// Name of the failed operation, as used in the `[prog] <op> failed`
    /// line printed by the binaries.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Config(_) => "configure",
            Self::Shm(ShmError::ResourceConflict { .. } | ShmError::NotFound { .. }) => "open_ring",
            Self::Shm(ShmError::ProtocolViolation { .. }) => "read_ring",
            Self::Shm(_) => "ring",
            Self::Graph(_) => "parse_graph",
            Self::Signal(_) => "sigaction",
            Self::Output(_) => "write",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid configuration: {e}"),
            Self::Shm(e) => write!(f, "{e}"),
            Self::Graph(e) => write!(f, "{e}"),
            Self::Signal(e) => write!(f, "cannot install signal handler: {e}"),
            Self::Output(e) => write!(f, "cannot write output: {e}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Shm(e) => Some(e),
            Self::Graph(e) => Some(e),
            Self::Signal(e) => Some(e),
            Self::Output(e) => Some(e),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ShmError> for EngineError {
    fn from(e: ShmError) -> Self {
        Self::Shm(e)
    }
}

impl From<GraphError> for EngineError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<io::Error> for EngineError {
    fn from(e: io::Error) -> Self {
        Self::Output(e)
    }
}
