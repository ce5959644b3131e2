pub mod accessor;
pub mod index;
pub mod parse;
pub mod types;

pub use accessor::GraphAccessor;
pub use parse::parse_snapshot;
pub use types::{Edge, EdgeData, GraphSnapshot, Node, NodeKind, Protocol, DEFAULT_LATENCY_MS};
