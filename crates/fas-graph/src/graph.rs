//! Directed graph built from an edge list.

use indexmap::IndexSet;

use fas_core::Edge;

use crate::error::GraphError;

/// A directed graph without self-loops or parallel edges.
///
/// Vertices are the endpoints mentioned by the edges, kept in first-seen
/// order; duplicate edges collapse onto their first occurrence. Both sets
/// are insertion-ordered so that a given edge list and seed always produce
/// the same candidates.
#[derive(Clone, Debug)]
pub struct Graph {
    vertices: IndexSet<i32>,
    edges: IndexSet<Edge>,
    /// `edges` as `(start, end)` positions into `vertices`.
    indexed: Vec<(usize, usize)>,
}

impl Graph {
    /// Build a graph from edges.
    pub fn from_edges<I>(edges: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = Edge>,
    {
        let mut vertices = IndexSet::new();
        let mut unique = IndexSet::new();
        for edge in edges {
            if edge.is_self_loop() {
                return Err(GraphError::SelfLoop { edge });
            }
            unique.insert(edge);
            vertices.insert(edge.start);
            vertices.insert(edge.end);
        }
        if unique.is_empty() {
            return Err(GraphError::Empty);
        }

        let position = |v: &i32| vertices.get_index_of(v).unwrap_or_default();
        let indexed = unique
            .iter()
            .map(|e| (position(&e.start), position(&e.end)))
            .collect();
        Ok(Self {
            vertices,
            edges: unique,
            indexed,
        })
    }

    /// Parse `u-v` tokens, as given on a command line, into a graph.
    pub fn parse<I, S>(args: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let edges = args
            .into_iter()
            .map(|arg| arg.as_ref().parse::<Edge>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_edges(edges)
    }

    /// Vertices in first-seen order.
    pub fn vertices(&self) -> &IndexSet<i32> {
        &self.vertices
    }

    /// Distinct edges in first-seen order.
    pub fn edges(&self) -> &IndexSet<Edge> {
        &self.edges
    }

    /// Number of distinct vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub(crate) fn indexed_edges(&self) -> &[(usize, usize)] {
        &self.indexed
    }

    /// Whether the graph has no cycle once `removed` is taken out.
    ///
    /// Kahn's algorithm: repeatedly strip vertices without incoming edges;
    /// the graph is acyclic iff every vertex gets stripped.
    pub fn is_acyclic_without(&self, removed: &[Edge]) -> bool {
        let n = self.vertices.len();
        let mut in_degree = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (edge, &(from, to)) in self.edges.iter().zip(&self.indexed) {
            if removed.contains(edge) {
                continue;
            }
            successors[from].push(to);
            in_degree[to] += 1;
        }

        let mut ready: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
        let mut stripped = 0;
        while let Some(v) = ready.pop() {
            stripped += 1;
            for &next in &successors[v] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(next);
                }
            }
        }
        stripped == n
    }

    /// Whether the graph itself has no cycle.
    pub fn is_acyclic(&self) -> bool {
        self.is_acyclic_without(&[])
    }
}
