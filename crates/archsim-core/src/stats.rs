//! Display statistics derived from committed results.
//!
//! Nothing here runs an algorithm; every figure is read off a
//! [`FlowTrace`], [`BlastRadius`], [`PartitionResult`] or the chaos history.

use std::collections::BTreeSet;

use archsim_engine::{BlastRadius, FlowTrace, PartitionResult};
use archsim_graph::Protocol;
use serde::Serialize;

use crate::session::ChaosRoundRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStats {
    pub hop_count: usize,
    pub node_count: usize,
    /// Number of branch levels.
    pub depth: usize,
    /// Sorted, untagged hops excluded.
    pub distinct_protocols: Vec<Protocol>,
    pub total_latency_ms: f64,
}

impl FlowStats {
    pub fn from_trace(trace: &FlowTrace) -> Self {
        let protocols: BTreeSet<Protocol> =
            trace.steps.iter().filter_map(|step| step.protocol).collect();
        Self {
            hop_count: trace.hop_count(),
            node_count: trace.node_ids.len(),
            depth: trace.level_count(),
            distinct_protocols: protocols.into_iter().collect(),
            total_latency_ms: trace.steps.iter().map(|step| step.latency_ms).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactStats {
    pub failed_count: usize,
    pub affected_count: usize,
    pub broken_edge_count: usize,
    /// Share of architecture nodes that are failed or affected, 0-100.
    pub affected_percent: f64,
}

impl ImpactStats {
    pub fn from_blast(
        failed_count: usize,
        blast: &BlastRadius,
        architecture_node_count: usize,
    ) -> Self {
        let affected_count = blast.affected_node_ids.len();
        let affected_percent = if architecture_node_count == 0 {
            0.0
        } else {
            let hit = (failed_count + affected_count) as f64;
            (hit / architecture_node_count as f64 * 100.0).min(100.0)
        };
        Self {
            failed_count,
            affected_count,
            broken_edge_count: blast.broken_edge_ids.len(),
            affected_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionStats {
    pub group_a_size: usize,
    pub group_b_size: usize,
    pub severed_count: usize,
}

impl PartitionStats {
    pub fn from_partition(partition: &PartitionResult) -> Self {
        Self {
            group_a_size: partition.group_a.len(),
            group_b_size: partition.group_b.len(),
            severed_count: partition.severed_edge_ids.len(),
        }
    }
}

/// Milliseconds between consecutive rounds, oldest first.
pub fn round_intervals(history: &[ChaosRoundRecord]) -> Vec<u64> {
    history
        .windows(2)
        .map(|pair| pair[1].elapsed_ms.saturating_sub(pair[0].elapsed_ms))
        .collect()
}
