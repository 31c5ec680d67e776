//! Reusable graph and slot fixtures.
//!
//! - [`EXAMPLE_EDGES`]: the nine-edge demo graph, whose minimum feedback
//!   arc set is a single edge.
//! - [`TRIANGLE`]: the smallest cyclic graph.
//! - [`CHAIN`]: an acyclic path.

use fas_core::{Edge, FasSlot};

/// `0-1 1-2 1-3 1-4 2-4 3-6 4-3 4-5 6-0`. Every cycle runs through
/// `0-1`, `3-6` and `6-0`, so removing any one of them suffices.
pub const EXAMPLE_EDGES: [&str; 9] = [
    "0-1", "1-2", "1-3", "1-4", "2-4", "3-6", "4-3", "4-5", "6-0",
];

/// `0-1 1-2 2-0`.
pub const TRIANGLE: [&str; 3] = ["0-1", "1-2", "2-0"];

/// `0-1 1-2 2-3 3-4`.
pub const CHAIN: [&str; 4] = ["0-1", "1-2", "2-3", "3-4"];

/// Parse a fixture into edges.
pub fn edges(list: &[&str]) -> Vec<Edge> {
    list.iter()
        .map(|s| s.parse().expect("fixture edge"))
        .collect()
}

/// Fixture arguments as owned strings, for building command lines.
pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// A slot holding the given `(start, end)` pairs.
pub fn slot(pairs: &[(i32, i32)]) -> FasSlot {
    let edges: Vec<Edge> = pairs.iter().copied().map(Edge::from).collect();
    FasSlot::from_edges(&edges).expect("fixture slot fits")
}

/// A slot of exactly `len` distinct edges `i-(i+1)`.
pub fn slot_of_len(len: usize) -> FasSlot {
    let pairs: Vec<(i32, i32)> = (0..len as i32).map(|i| (i, i + 1)).collect();
    slot(&pairs)
}
