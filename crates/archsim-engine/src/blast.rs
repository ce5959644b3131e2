//! Cascading failure propagation.
//!
//! Multi-source BFS seeded from every failed node at once, following
//! outgoing edges only. Anything downstream of a failure is affected; each
//! depth of the expansion is kept as a [`CascadeLevel`] so the cascade can
//! be replayed as waves. A final sweep over all edges marks every edge that
//! touches a failed or affected node as broken, including edges pointing
//! into the failure set that the forward walk never traverses.

use std::collections::{BTreeSet, HashSet};

use archsim_graph::index::EdgeIndex;
use archsim_graph::types::Edge;
use serde::Serialize;
use tracing::trace;

/// One wave of the cascade.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeLevel {
    pub depth: usize,
    /// Nodes first reached at this depth.
    pub node_ids: Vec<String>,
    /// Edges followed at this depth, including ones into already-hit nodes.
    pub edge_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlastRadius {
    /// Downstream nodes hit by the cascade. Never contains a seed failure.
    pub affected_node_ids: BTreeSet<String>,
    pub broken_edge_ids: BTreeSet<String>,
    pub levels: Vec<CascadeLevel>,
}

impl BlastRadius {
    pub fn is_empty(&self) -> bool {
        self.affected_node_ids.is_empty() && self.broken_edge_ids.is_empty()
    }
}

/// Compute the blast radius of failing `failed_node_ids` together.
pub fn compute_blast_radius<I, S>(edges: &[Edge], failed_node_ids: I) -> BlastRadius
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let failed: Vec<String> = {
        let mut seen = HashSet::new();
        failed_node_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .filter(|id| seen.insert(id.clone()))
            .collect()
    };
    if failed.is_empty() {
        return BlastRadius::default();
    }

    let index = EdgeIndex::new(edges);
    let mut visited: HashSet<&str> = failed.iter().map(String::as_str).collect();
    let mut result = BlastRadius::default();
    let mut frontier: Vec<&str> = failed.iter().map(String::as_str).collect();
    let mut depth = 0;

    while !frontier.is_empty() {
        let mut next = Vec::new();
        let mut level = CascadeLevel {
            depth,
            node_ids: Vec::new(),
            edge_ids: Vec::new(),
        };

        for current in frontier {
            for &idx in index.outgoing(current) {
                let edge = index.edge(idx);
                let target = edge.target.as_str();
                if visited.insert(target) {
                    result.affected_node_ids.insert(target.to_string());
                    level.node_ids.push(target.to_string());
                    next.push(target);
                }
                level.edge_ids.push(edge.id.clone());
                result.broken_edge_ids.insert(edge.id.clone());
            }
        }

        if !level.edge_ids.is_empty() {
            result.levels.push(level);
            depth += 1;
        }
        frontier = next;
    }

    // Sweep: anything touching the dead set is broken, whichever way it points.
    for edge in edges {
        if visited.contains(edge.source.as_str()) || visited.contains(edge.target.as_str()) {
            result.broken_edge_ids.insert(edge.id.clone());
        }
    }

    trace!(
        failed = failed.len(),
        affected = result.affected_node_ids.len(),
        broken = result.broken_edge_ids.len(),
        "blast radius computed"
    );
    result
}
