//! Branch-aware request flow tracing.
//!
//! Breadth-first from a source node, one frontier per depth. Each edge is
//! consumed at most once, the first time any frontier node reaches it, in
//! whichever direction that happens. A node reachable by several paths is
//! entered via the first one found; alternative path lengths are not
//! compared, so the trace is one consistent path set rather than a
//! shortest-path tree.

use std::collections::HashSet;

use archsim_graph::index::EdgeIndex;
use archsim_graph::types::{Edge, Protocol};
use serde::Serialize;
use tracing::trace;

/// One hop of a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStep {
    pub edge_id: String,
    pub from_node_id: String,
    pub to_node_id: String,
    pub protocol: Option<Protocol>,
    pub latency_ms: f64,
}

/// A hop inside a branch level. `branch_id` tells parallel hops at the
/// same depth apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchStep {
    pub branch_id: String,
    #[serde(flatten)]
    pub step: FlowStep,
}

/// All hops taken at one BFS depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchLevel {
    pub depth: usize,
    pub steps: Vec<BranchStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowTrace {
    /// Nodes in visitation order, source first.
    pub node_ids: Vec<String>,
    /// Edges in consumption order. Never contains a duplicate.
    pub edge_ids: Vec<String>,
    pub steps: Vec<FlowStep>,
    pub levels: Vec<BranchLevel>,
}

impl FlowTrace {
    pub fn hop_count(&self) -> usize {
        self.steps.len()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// A trace that reaches nothing beyond its source.
    pub fn is_trivial(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Branch identity for a hop: the origin node plus the edge taken from it.
pub fn branch_id(from_node_id: &str, edge_id: &str) -> String {
    format!("{from_node_id}:{edge_id}")
}

/// Trace how a request entering at `source_node_id` spreads over `edges`.
///
/// Outgoing edges are followed from every frontier node; incoming edges are
/// followed backwards only when marked bidirectional. A source that no edge
/// touches yields a trace containing just the source.
pub fn trace_flow_path(edges: &[Edge], source_node_id: &str) -> FlowTrace {
    let index = EdgeIndex::new(edges);
    let mut tracer = Tracer::new(edges.len(), source_node_id);
    tracer.run(&index);
    let trace = tracer.trace;
    trace!(
        source = source_node_id,
        hops = trace.steps.len(),
        levels = trace.levels.len(),
        "flow traced"
    );
    trace
}

struct Tracer<'a> {
    visited_nodes: HashSet<&'a str>,
    visited_edges: Vec<bool>,
    frontier: Vec<&'a str>,
    trace: FlowTrace,
}

impl<'a> Tracer<'a> {
    fn new(edge_count: usize, source: &'a str) -> Self {
        let mut visited_nodes = HashSet::new();
        visited_nodes.insert(source);
        Self {
            visited_nodes,
            visited_edges: vec![false; edge_count],
            frontier: vec![source],
            trace: FlowTrace {
                node_ids: vec![source.to_string()],
                ..FlowTrace::default()
            },
        }
    }

    fn run(&mut self, index: &EdgeIndex<'a>) {
        let mut depth = 0;
        while !self.frontier.is_empty() {
            let frontier = std::mem::take(&mut self.frontier);
            let mut next = Vec::new();
            let mut level = Vec::new();

            for current in frontier {
                for &idx in index.outgoing(current) {
                    let edge = index.edge(idx);
                    self.hop(idx, edge, current, edge.target.as_str(), &mut next, &mut level);
                }
                for &idx in index.incoming(current) {
                    let edge = index.edge(idx);
                    if edge.is_bidirectional() {
                        self.hop(idx, edge, current, edge.source.as_str(), &mut next, &mut level);
                    }
                }
            }

            if !level.is_empty() {
                self.trace.levels.push(BranchLevel {
                    depth,
                    steps: level,
                });
                depth += 1;
            }
            self.frontier = next;
        }
    }

    fn hop(
        &mut self,
        idx: usize,
        edge: &'a Edge,
        from: &'a str,
        to: &'a str,
        next: &mut Vec<&'a str>,
        level: &mut Vec<BranchStep>,
    ) {
        if self.visited_edges[idx] {
            return;
        }
        self.visited_edges[idx] = true;

        let step = FlowStep {
            edge_id: edge.id.clone(),
            from_node_id: from.to_string(),
            to_node_id: to.to_string(),
            protocol: edge.protocol(),
            latency_ms: edge.latency_ms(),
        };
        self.trace.edge_ids.push(edge.id.clone());
        self.trace.steps.push(step.clone());
        level.push(BranchStep {
            branch_id: branch_id(from, &edge.id),
            step,
        });

        if self.visited_nodes.insert(to) {
            self.trace.node_ids.push(to.to_string());
            next.push(to);
        }
    }
}
