//! Graph construction errors.

use std::error::Error;
use std::fmt;

use fas_core::{Edge, EdgeParseError};

/// Why an edge list could not be turned into a [`Graph`](crate::Graph).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// No edges were given.
    Empty,
    /// An argument was not of the form `u-v`.
    InvalidEdge(EdgeParseError),
    /// An edge from a vertex to itself. No vertex order can place such an
    /// edge backwards, so the search could never remove it.
    SelfLoop {
        /// The offending edge.
        edge: Edge,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "graph has no edges"),
            Self::InvalidEdge(e) => write!(f, "{e}"),
            Self::SelfLoop { edge } => write!(f, "self-loop {edge} is not supported"),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEdge(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EdgeParseError> for GraphError {
    fn from(e: EdgeParseError) -> Self {
        Self::InvalidEdge(e)
    }
}
