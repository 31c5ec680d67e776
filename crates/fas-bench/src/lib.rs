//! Benchmark graph profiles for the FAS search.
//!
//! - [`example_graph`]: the nine-edge demo graph
//! - [`complete_digraph`]: both directions between every vertex pair
//! - [`random_graph`]: sparse random digraph, deterministic via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use fas_core::Edge;
use fas_graph::Graph;
use fas_test_utils::fixtures;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// The demo graph from [`fixtures::EXAMPLE_EDGES`].
pub fn example_graph() -> Graph {
    Graph::parse(fixtures::EXAMPLE_EDGES).expect("example graph")
}

/// Every ordered pair of distinct vertices in `0..n`. Each vertex order
/// puts exactly `n * (n - 1) / 2` edges backwards.
pub fn complete_digraph(n: i32) -> Graph {
    let edges = (0..n).flat_map(|u| (0..n).filter(move |&v| v != u).map(move |v| Edge::new(u, v)));
    Graph::from_edges(edges).expect("n >= 2")
}

/// `edges` random edges between `vertices` vertices, without self-loops.
/// Duplicates collapse, so the result may have slightly fewer edges.
pub fn random_graph(vertices: i32, edges: usize, seed: u64) -> Graph {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut list = Vec::with_capacity(edges);
    while list.len() < edges {
        let u = rng.random_range(0..vertices);
        let v = rng.random_range(0..vertices);
        if u != v {
            list.push(Edge::new(u, v));
        }
    }
    Graph::from_edges(list).expect("vertices >= 2")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_build() {
        let example: Vec<_> = example_graph().edges().iter().copied().collect();
        assert_eq!(example, fixtures::edges(&fixtures::EXAMPLE_EDGES));
        assert_eq!(complete_digraph(5).edge_count(), 20);
        let g = random_graph(50, 200, 1);
        assert!(g.edge_count() <= 200 && g.edge_count() > 150);
        assert!(g.vertex_count() <= 50);
    }
}
