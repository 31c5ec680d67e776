//! Directed graphs given as edge lists, and the randomized search that
//! turns them into feedback arc set candidates.
//!
//! A [`FasSearcher`] shuffles the vertices into a random linear order and
//! proposes every edge pointing backwards in that order. Removing the
//! proposal always leaves an acyclic graph; repeating with fresh orders
//! finds smaller and smaller sets.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod graph;
pub mod search;

pub use error::GraphError;
pub use graph::Graph;
pub use search::{Candidate, FasSearcher};
