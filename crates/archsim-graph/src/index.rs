//! Adjacency over an edge slice.
//!
//! Edges are addressed by their position in the slice, so visited sets in
//! the traversal code are plain `Vec<bool>` arenas rather than id hashes.

use std::collections::HashMap;

use crate::types::Edge;

#[derive(Debug, Clone)]
pub struct EdgeIndex<'a> {
    edges: &'a [Edge],
    outgoing: HashMap<&'a str, Vec<usize>>,
    incoming: HashMap<&'a str, Vec<usize>>,
}

impl<'a> EdgeIndex<'a> {
    pub fn new(edges: &'a [Edge]) -> Self {
        let mut outgoing: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.source.as_str()).or_default().push(idx);
            incoming.entry(edge.target.as_str()).or_default().push(idx);
        }
        Self {
            edges,
            outgoing,
            incoming,
        }
    }

    pub fn edge(&self, idx: usize) -> &'a Edge {
        &self.edges[idx]
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Indices of edges leaving `node`, in slice order.
    pub fn outgoing(&self, node: &str) -> &[usize] {
        self.outgoing.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indices of edges arriving at `node`, in slice order.
    pub fn incoming(&self, node: &str) -> &[usize] {
        self.incoming.get(node).map(Vec::as_slice).unwrap_or(&[])
    }
}
