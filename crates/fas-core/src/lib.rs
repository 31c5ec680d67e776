//! Core value types for the feedback arc set search.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! values that cross the process boundary (edges and ring slots), the
//! fixed resource names both roles agree on, and their error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod edge;
pub mod error;
pub mod names;
pub mod slot;

pub use edge::Edge;
pub use error::{EdgeParseError, SlotError};
pub use names::{ResourceNames, DEFAULT_RESOURCES};
pub use slot::{FasSlot, MAX_FAS_LEN};
