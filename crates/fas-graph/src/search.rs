//! Randomized feedback arc set candidates.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

use fas_core::{Edge, MAX_FAS_LEN};

use crate::graph::Graph;

/// A candidate feedback arc set. Inline up to the ring slot capacity;
/// larger candidates spill to the heap and are later discarded.
pub type Candidate = SmallVec<[Edge; MAX_FAS_LEN]>;

/// Produces one candidate per call from a fresh random vertex order.
///
/// Deterministic for a given graph and seed.
#[derive(Debug)]
pub struct FasSearcher {
    graph: Graph,
    seed: u64,
    rng: ChaCha8Rng,
    /// Vertex positions into `graph.vertices()`, shuffled each call.
    order: Vec<usize>,
    /// `rank[v]` is the place of vertex `v` in `order`.
    rank: Vec<usize>,
}

impl FasSearcher {
    /// Searcher with a fixed seed.
    pub fn new(graph: Graph, seed: u64) -> Self {
        let n = graph.vertex_count();
        Self {
            graph,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            order: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Searcher seeded from the thread-local OS-seeded generator.
    pub fn from_entropy(graph: Graph) -> Self {
        Self::new(graph, rand::random())
    }

    /// The seed this searcher was built with, for reproducing a run.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The graph being searched.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Shuffle the vertex order and return every edge pointing backwards
    /// in it.
    ///
    /// Removing the returned edges leaves only forward edges, so the rest
    /// of the graph is acyclic. An empty candidate proves the whole graph
    /// is acyclic.
    pub fn next_candidate(&mut self) -> Candidate {
        self.order.shuffle(&mut self.rng);
        for (place, &v) in self.order.iter().enumerate() {
            self.rank[v] = place;
        }
        self.graph
            .edges()
            .iter()
            .zip(self.graph.indexed_edges())
            .filter(|(_, &(from, to))| self.rank[to] < self.rank[from])
            .map(|(edge, _)| *edge)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fas_test_utils::fixtures::{CHAIN, EXAMPLE_EDGES, TRIANGLE};
    use proptest::prelude::*;

    #[test]
    fn same_seed_same_candidates() {
        let graph = Graph::parse(EXAMPLE_EDGES).unwrap();
        let mut a = FasSearcher::new(graph.clone(), 42);
        let mut b = FasSearcher::new(graph, 42);
        for _ in 0..50 {
            assert_eq!(a.next_candidate(), b.next_candidate());
        }
        assert_eq!(a.seed(), 42);
    }

    #[test]
    fn triangle_always_needs_at_least_one_edge() {
        let mut searcher = FasSearcher::new(Graph::parse(TRIANGLE).unwrap(), 7);
        for _ in 0..100 {
            let candidate = searcher.next_candidate();
            assert!((1..=2).contains(&candidate.len()), "{candidate:?}");
        }
    }

    #[test]
    fn example_graph_reaches_single_edge_solution() {
        let mut searcher = FasSearcher::new(Graph::parse(EXAMPLE_EDGES).unwrap(), 1);
        let best = (0..20_000)
            .map(|_| searcher.next_candidate().len())
            .min()
            .unwrap();
        assert_eq!(best, 1);
    }

    #[test]
    fn acyclic_graph_eventually_proves_itself() {
        let mut searcher = FasSearcher::new(Graph::parse(CHAIN).unwrap(), 3);
        let found = (0..10_000).any(|_| searcher.next_candidate().is_empty());
        assert!(found);
    }

    fn arbitrary_graph() -> impl Strategy<Value = Graph> {
        proptest::collection::vec((0i32..12, 0i32..12), 1..40).prop_filter_map(
            "needs at least one non-loop edge",
            |pairs| {
                let edges = pairs
                    .into_iter()
                    .filter(|(u, v)| u != v)
                    .map(Edge::from);
                Graph::from_edges(edges).ok()
            },
        )
    }

    proptest! {
        #[test]
        fn removing_candidate_leaves_acyclic_graph(graph in arbitrary_graph(), seed in any::<u64>()) {
            let mut searcher = FasSearcher::new(graph, seed);
            for _ in 0..4 {
                let candidate = searcher.next_candidate();
                prop_assert!(searcher.graph().is_acyclic_without(&candidate));
                if candidate.is_empty() {
                    prop_assert!(searcher.graph().is_acyclic());
                }
            }
        }
    }
}
