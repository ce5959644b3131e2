use crate::types::GraphSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Duplicate edge id: {0}")]
    DuplicateEdge(String),
}

/// Parse an editor graph export into a snapshot.
///
/// Ids must be unique within their own list. Edges may reference node ids
/// that are absent from the node list; those edges are simply never
/// traversable.
pub fn parse_snapshot(json: &str) -> Result<GraphSnapshot, ParseError> {
    let snapshot: GraphSnapshot = serde_json::from_str(json)?;

    let mut seen = std::collections::HashSet::new();
    for node in &snapshot.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(ParseError::DuplicateNode(node.id.clone()));
        }
    }

    seen.clear();
    for edge in &snapshot.edges {
        if !seen.insert(edge.id.as_str()) {
            return Err(ParseError::DuplicateEdge(edge.id.clone()));
        }
    }

    Ok(snapshot)
}
