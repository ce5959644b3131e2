use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Latency assumed for an edge that does not declare one.
pub const DEFAULT_LATENCY_MS: f64 = 50.0;

/// An immutable view of the diagram: ordered nodes plus ordered edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

// ── Nodes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default, alias = "type")]
    pub kind: NodeKind,
}

/// Only `Architecture` nodes take part in simulation. Groups and comments
/// are layout and annotation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Architecture,
    Group,
    Comment,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn architecture(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Architecture)
    }

    pub fn is_architecture(&self) -> bool {
        self.kind == NodeKind::Architecture
    }
}

// ── Edges ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    #[serde(alias = "sourceNodeId")]
    pub source: String,
    #[serde(alias = "targetNodeId")]
    pub target: String,
    #[serde(default)]
    pub data: EdgeData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default)]
    pub bidirectional: bool,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            data: EdgeData::default(),
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.data.protocol = Some(protocol);
        self
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.data.latency_ms = Some(latency_ms);
        self
    }

    pub fn bidirectional(mut self) -> Self {
        self.data.bidirectional = true;
        self
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.data.protocol
    }

    /// Declared latency, or [`DEFAULT_LATENCY_MS`] when absent.
    pub fn latency_ms(&self) -> f64 {
        self.data.latency_ms.unwrap_or(DEFAULT_LATENCY_MS)
    }

    pub fn is_bidirectional(&self) -> bool {
        self.data.bidirectional
    }

    /// True if either endpoint is `node_id`.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Connection protocol tag. Unrecognized tags deserialize as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Grpc,
    Websocket,
    Tcp,
    Udp,
    Graphql,
    Rest,
    Sql,
    Redis,
    Amqp,
    Kafka,
    Mqtt,
    #[serde(other)]
    Other,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Grpc => "grpc",
            Protocol::Websocket => "websocket",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Graphql => "graphql",
            Protocol::Rest => "rest",
            Protocol::Sql => "sql",
            Protocol::Redis => "redis",
            Protocol::Amqp => "amqp",
            Protocol::Kafka => "kafka",
            Protocol::Mqtt => "mqtt",
            Protocol::Other => "other",
        };
        f.write_str(name)
    }
}

// ── Snapshot views ───────────────────────────────────────────────────

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_architecture_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id && n.is_architecture())
    }

    /// Architecture node ids in snapshot order, first occurrence wins.
    pub fn architecture_node_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .filter(|n| n.is_architecture() && seen.insert(n.id.as_str()))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Edges whose endpoints are both architecture nodes, in snapshot order.
    pub fn architecture_edges(&self) -> Vec<Edge> {
        let arch: HashSet<&str> = self
            .nodes
            .iter()
            .filter(|n| n.is_architecture())
            .map(|n| n.id.as_str())
            .collect();
        self.edges
            .iter()
            .filter(|e| arch.contains(e.source.as_str()) && arch.contains(e.target.as_str()))
            .cloned()
            .collect()
    }
}
