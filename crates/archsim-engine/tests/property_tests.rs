use std::collections::{BTreeSet, HashSet};

use archsim_engine::rng::round_rng;
use archsim_engine::{compute_blast_radius, compute_partition, select_random_targets, trace_flow_path};
use archsim_graph::types::Edge;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Random directed multigraph with self-loops, parallel edges and some
/// bidirectional edges.
fn random_graph(rng: &mut ChaCha8Rng) -> (Vec<String>, Vec<Edge>) {
    let node_count = rng.gen_range(1..=12);
    let nodes: Vec<String> = (0..node_count).map(|i| format!("n{i}")).collect();
    let edge_count = rng.gen_range(0..=node_count * 3);
    let edges = (0..edge_count)
        .map(|i| {
            let s = rng.gen_range(0..node_count);
            let t = rng.gen_range(0..node_count);
            let edge = Edge::new(format!("e{i}"), nodes[s].clone(), nodes[t].clone());
            if rng.gen_bool(0.25) {
                edge.bidirectional()
            } else {
                edge
            }
        })
        .collect();
    (nodes, edges)
}

#[test]
fn test_flow_trace_never_repeats_an_edge() {
    for seed in 0..200 {
        let mut rng = round_rng(seed, 0);
        let (nodes, edges) = random_graph(&mut rng);
        let source = &nodes[rng.gen_range(0..nodes.len())];
        let trace = trace_flow_path(&edges, source);

        let unique: HashSet<&String> = trace.edge_ids.iter().collect();
        assert_eq!(unique.len(), trace.edge_ids.len(), "seed {seed}");

        let unique_nodes: HashSet<&String> = trace.node_ids.iter().collect();
        assert_eq!(unique_nodes.len(), trace.node_ids.len(), "seed {seed}");
        assert_eq!(&trace.node_ids[0], source);

        let level_steps: usize = trace.levels.iter().map(|l| l.steps.len()).sum();
        assert_eq!(level_steps, trace.steps.len(), "seed {seed}");
    }
}

#[test]
fn test_blast_radius_invariants() {
    for seed in 0..200 {
        let mut rng = round_rng(seed, 1);
        let (nodes, edges) = random_graph(&mut rng);
        let failed: BTreeSet<String> = nodes
            .iter()
            .filter(|_| rng.gen_bool(0.3))
            .cloned()
            .collect();
        if failed.is_empty() {
            continue;
        }

        let blast = compute_blast_radius(&edges, &failed);
        assert!(
            blast.affected_node_ids.is_disjoint(&failed),
            "seed {seed}: affected overlaps failed"
        );

        for edge in &edges {
            let dead = |id: &String| failed.contains(id) || blast.affected_node_ids.contains(id);
            if dead(&edge.source) || dead(&edge.target) {
                assert!(
                    blast.broken_edge_ids.contains(&edge.id),
                    "seed {seed}: edge {} not broken",
                    edge.id
                );
            }
        }

        let leveled: BTreeSet<String> = blast
            .levels
            .iter()
            .flat_map(|l| l.node_ids.iter().cloned())
            .collect();
        assert_eq!(leveled, blast.affected_node_ids, "seed {seed}");
    }
}

#[test]
fn test_selector_respects_exclusions_and_quota() {
    for seed in 0..200 {
        let mut rng = round_rng(seed, 2);
        let (nodes, _) = random_graph(&mut rng);
        let protected: BTreeSet<String> =
            nodes.iter().filter(|_| rng.gen_bool(0.2)).cloned().collect();
        let failed: BTreeSet<String> =
            nodes.iter().filter(|_| rng.gen_bool(0.2)).cloned().collect();
        let max = rng.gen_range(0..4);
        let probability = rng.gen::<f64>();

        let picked = select_random_targets(&mut rng, &nodes, probability, max, &protected, &failed);
        assert!(picked.len() <= max, "seed {seed}");
        for id in &picked {
            assert!(!protected.contains(id) && !failed.contains(id), "seed {seed}");
        }
        let unique: HashSet<&String> = picked.iter().collect();
        assert_eq!(unique.len(), picked.len());

        let eligible = nodes
            .iter()
            .filter(|n| !protected.contains(*n) && !failed.contains(*n))
            .count();
        if eligible > 0 && max > 0 {
            assert!(!picked.is_empty(), "seed {seed}: round did nothing");
        }
    }
}

#[test]
fn test_selector_exact_quota_at_certainty() {
    let nodes: Vec<String> = (0..8).map(|i| format!("n{i}")).collect();
    for k in 1..=8 {
        let mut rng = round_rng(k as u64, 3);
        let picked =
            select_random_targets(&mut rng, &nodes, 1.0, k, &BTreeSet::new(), &BTreeSet::new());
        assert_eq!(picked.len(), k);
    }
}

#[test]
fn test_partition_covers_every_node_once() {
    for seed in 0..200 {
        let mut rng = round_rng(seed, 4);
        let (nodes, edges) = random_graph(&mut rng);
        let protected: BTreeSet<String> =
            nodes.iter().filter(|_| rng.gen_bool(0.2)).cloned().collect();

        let result = compute_partition(&mut rng, &nodes, &edges, &protected);

        let mut all: Vec<&String> = result.group_a.iter().chain(&result.group_b).collect();
        all.sort();
        let mut expected: Vec<&String> = nodes.iter().collect();
        expected.sort();
        assert_eq!(all, expected, "seed {seed}");

        if !result.severed_edge_ids.is_empty() {
            assert!(result.is_split(), "seed {seed}: severed but not split");
        }
        for id in &result.severed_edge_ids {
            let edge = edges.iter().find(|e| &e.id == id).unwrap();
            assert!(
                !(protected.contains(&edge.source) && protected.contains(&edge.target)),
                "seed {seed}: protected edge severed"
            );
        }
    }
}

#[test]
fn test_results_serialize_camel_case() {
    let edges = vec![Edge::new("ab", "A", "B")];
    let trace = trace_flow_path(&edges, "A");
    let json = serde_json::to_value(&trace).unwrap();
    assert!(json.get("nodeIds").is_some());
    assert_eq!(json["levels"][0]["steps"][0]["branchId"], "A:ab");
    assert_eq!(json["levels"][0]["steps"][0]["fromNodeId"], "A");

    let blast = compute_blast_radius(&edges, ["A"]);
    let json = serde_json::to_value(&blast).unwrap();
    assert_eq!(json["affectedNodeIds"][0], "B");
    assert_eq!(json["brokenEdgeIds"][0], "ab");
}
