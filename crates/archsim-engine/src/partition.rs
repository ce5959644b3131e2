//! Network partition by random edge severance.
//!
//! A random 30-50% of the severable edges is cut, the surviving edges are
//! merged in a [`UnionFind`], and the largest connected component becomes
//! group A while every other component is folded into group B. When the
//! cut leaves the graph connected, a positional split is used instead so a
//! partition is always visible once anything has been severed.

use std::collections::{BTreeSet, HashMap, HashSet};

use archsim_graph::types::Edge;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::trace;

use crate::union_find::UnionFind;

/// Lower bound of the fraction of candidate edges severed per partition.
pub const SEVER_RATIO_MIN: f64 = 0.3;
/// Upper bound of the fraction of candidate edges severed per partition.
pub const SEVER_RATIO_MAX: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionResult {
    pub group_a: Vec<String>,
    pub group_b: Vec<String>,
    pub severed_edge_ids: Vec<String>,
}

impl PartitionResult {
    fn unsplit(nodes: Vec<String>) -> Self {
        Self {
            group_a: nodes,
            group_b: Vec::new(),
            severed_edge_ids: Vec::new(),
        }
    }

    /// True when the nodes were actually split into two sides.
    pub fn is_split(&self) -> bool {
        !self.group_a.is_empty() && !self.group_b.is_empty()
    }
}

/// Partition `architecture_nodes` by severing a random subset of `edges`.
///
/// Edges with both endpoints protected are never severed. Fewer than two
/// nodes, or no severable edge, gives everything in group A and nothing
/// severed.
pub fn compute_partition<R: Rng>(
    rng: &mut R,
    architecture_nodes: &[String],
    edges: &[Edge],
    protected_ids: &BTreeSet<String>,
) -> PartitionResult {
    let nodes: Vec<String> = {
        let mut seen = HashSet::new();
        architecture_nodes
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    };
    if nodes.len() < 2 {
        return PartitionResult::unsplit(nodes);
    }

    let mut candidates: Vec<&Edge> = edges
        .iter()
        .filter(|e| !(protected_ids.contains(&e.source) && protected_ids.contains(&e.target)))
        .collect();
    if candidates.is_empty() {
        return PartitionResult::unsplit(nodes);
    }

    let ratio = rng.gen_range(SEVER_RATIO_MIN..=SEVER_RATIO_MAX);
    let sever_count = ((candidates.len() as f64 * ratio).ceil() as usize)
        .max(1)
        .min(candidates.len());
    candidates.shuffle(rng);
    let severed_edge_ids: Vec<String> = candidates[..sever_count]
        .iter()
        .map(|e| e.id.clone())
        .collect();
    let severed: HashSet<&str> = severed_edge_ids.iter().map(String::as_str).collect();

    let position: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let mut components = UnionFind::new(nodes.len());
    for edge in edges {
        if severed.contains(edge.id.as_str()) {
            continue;
        }
        if let (Some(&a), Some(&b)) = (
            position.get(edge.source.as_str()),
            position.get(edge.target.as_str()),
        ) {
            components.union(a, b);
        }
    }

    // Components in first-seen order, then largest first (stable on ties).
    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<String>> = Vec::new();
    for (i, id) in nodes.iter().enumerate() {
        let root = components.find(i);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(id.clone());
    }
    groups.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut groups = groups.into_iter();
    let mut group_a = groups.next().unwrap_or_default();
    let mut group_b: Vec<String> = groups.flatten().collect();

    if group_b.is_empty() {
        // The cut left a connected graph; split by position instead.
        let mid = nodes.len().div_ceil(2);
        group_a = nodes[..mid].to_vec();
        group_b = nodes[mid..].to_vec();
    }

    trace!(
        candidates = candidates.len(),
        severed = severed_edge_ids.len(),
        group_a = group_a.len(),
        group_b = group_b.len(),
        "partition computed"
    );
    PartitionResult {
        group_a,
        group_b,
        severed_edge_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::round_rng;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_node_is_unsplit() {
        let mut rng = round_rng(0, 0);
        let result = compute_partition(&mut rng, &ids(&["A"]), &[], &BTreeSet::new());
        assert_eq!(result.group_a, vec!["A"]);
        assert!(result.group_b.is_empty());
        assert!(result.severed_edge_ids.is_empty());
    }

    #[test]
    fn test_no_edges_is_unsplit() {
        let mut rng = round_rng(0, 0);
        let result = compute_partition(&mut rng, &ids(&["A", "B"]), &[], &BTreeSet::new());
        assert_eq!(result.group_a, vec!["A", "B"]);
        assert!(!result.is_split());
    }

    #[test]
    fn test_fully_protected_edges_are_never_severed() {
        let mut rng = round_rng(0, 0);
        let edges = vec![Edge::new("ab", "A", "B")];
        let protected: BTreeSet<String> = ids(&["A", "B"]).into_iter().collect();
        let result = compute_partition(&mut rng, &ids(&["A", "B"]), &edges, &protected);
        assert!(result.severed_edge_ids.is_empty());
        assert!(result.group_b.is_empty());
    }

    #[test]
    fn test_single_edge_cut_splits_pair() {
        let mut rng = round_rng(5, 0);
        let edges = vec![Edge::new("ab", "A", "B")];
        let result = compute_partition(&mut rng, &ids(&["A", "B"]), &edges, &BTreeSet::new());
        assert_eq!(result.severed_edge_ids, vec!["ab"]);
        assert_eq!(result.group_a.len(), 1);
        assert_eq!(result.group_b.len(), 1);
    }

    #[test]
    fn test_redundant_paths_fall_back_to_positional_split() {
        // Three parallel edges: at most two are cut (ceil(3 * 0.5)), so the
        // pair always stays connected through the survivor.
        let edges = vec![
            Edge::new("ab1", "A", "B"),
            Edge::new("ab2", "A", "B"),
            Edge::new("ab3", "A", "B"),
        ];
        for seed in 0..20 {
            let mut rng = round_rng(seed, 0);
            let result =
                compute_partition(&mut rng, &ids(&["A", "B"]), &edges, &BTreeSet::new());
            assert!(!result.severed_edge_ids.is_empty());
            assert_eq!(result.group_a, vec!["A"]);
            assert_eq!(result.group_b, vec!["B"]);
        }
    }

    #[test]
    fn test_sever_count_within_ratio_bounds() {
        let nodes: Vec<String> = (0..11).map(|i| format!("n{i}")).collect();
        let edges: Vec<Edge> = (0..10)
            .map(|i| Edge::new(format!("e{i}"), format!("n{i}"), format!("n{}", i + 1)))
            .collect();
        for seed in 0..50 {
            let mut rng = round_rng(seed, 0);
            let result = compute_partition(&mut rng, &nodes, &edges, &BTreeSet::new());
            let cut = result.severed_edge_ids.len();
            assert!((3..=5).contains(&cut), "cut {cut} edges");
        }
    }

    #[test]
    fn test_largest_component_is_group_a() {
        // Star around hub; any cut leaves the hub component largest.
        let nodes = ids(&["hub", "a", "b", "c", "d", "e"]);
        let edges: Vec<Edge> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|leaf| Edge::new(format!("hub-{leaf}"), "hub", *leaf))
            .collect();
        for seed in 0..20 {
            let mut rng = round_rng(seed, 0);
            let result = compute_partition(&mut rng, &nodes, &edges, &BTreeSet::new());
            assert!(result.group_a.contains(&"hub".to_string()));
            assert!(result.group_a.len() >= 3);
            assert_eq!(result.group_b.len(), result.severed_edge_ids.len());
        }
    }
}
