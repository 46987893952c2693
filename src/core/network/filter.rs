//! Filter Engine
//!
//! Derives reduced views of a graph. The input graph is never modified; the
//! returned graph shares node and edge payloads with it through `Arc`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::network::builder::{Graph, Node};
use crate::core::network::entity::{EntityKey, EntityType};

/// User-selected view criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub entity_types: HashSet<EntityType>,
    /// Edges below this confidence are hidden.
    pub min_confidence: u8,
    /// Keep nodes left without edges after filtering.
    pub show_isolated_nodes: bool,
    /// Case-insensitive substring match on node labels.
    pub label_query: Option<String>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            entity_types: EntityType::ALL.into_iter().collect(),
            min_confidence: 0,
            show_isolated_nodes: true,
            label_query: None,
        }
    }
}

impl FilterSpec {
    pub fn with_types(mut self, types: impl IntoIterator<Item = EntityType>) -> Self {
        self.entity_types = types.into_iter().collect();
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: u8) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_isolated(mut self, show: bool) -> Self {
        self.show_isolated_nodes = show;
        self
    }

    pub fn with_label_query(mut self, query: &str) -> Self {
        let query = query.trim();
        self.label_query = (!query.is_empty()).then(|| query.to_lowercase());
        self
    }

    /// Flip one entity type on or off.
    pub fn toggle_type(&mut self, entity_type: EntityType) {
        if !self.entity_types.remove(&entity_type) {
            self.entity_types.insert(entity_type);
        }
    }

    fn admits(&self, node: &Node) -> bool {
        if !self.entity_types.contains(&node.entity_type) {
            return false;
        }
        match &self.label_query {
            Some(q) => node.label().to_lowercase().contains(&q.to_lowercase()),
            None => true,
        }
    }
}

/// Apply `spec` to `graph`.
///
/// Steps run in a fixed order: node-type/label selection, then edge pruning by
/// confidence and endpoint presence, then isolated-node pruning. Pruning
/// isolation last means a node whose only edge fell below the confidence
/// floor is removed when isolated nodes are hidden.
pub fn filter(graph: &Graph, spec: &FilterSpec) -> Graph {
    let nodes: Vec<&Node> = graph.nodes.iter().filter(|n| spec.admits(n)).collect();
    let kept: HashSet<EntityKey> = nodes.iter().map(|n| n.id).collect();

    let edges: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| e.confidence() >= spec.min_confidence)
        .filter(|e| kept.contains(&e.source) && kept.contains(&e.target))
        .cloned()
        .collect();

    let nodes: Vec<Node> = if spec.show_isolated_nodes {
        nodes.into_iter().cloned().collect()
    } else {
        let connected: HashSet<EntityKey> =
            edges.iter().flat_map(|e| [e.source, e.target]).collect();
        nodes
            .into_iter()
            .filter(|n| connected.contains(&n.id))
            .cloned()
            .collect()
    };

    log::debug!(
        "Filtered graph {}/{} nodes, {}/{} edges",
        nodes.len(),
        graph.nodes.len(),
        edges.len(),
        graph.edges.len()
    );

    Graph::new(nodes, edges)
}

/// Neighbourhood of `center` up to `depth` hops, ignoring edge direction.
/// Depth 0, or a center not in the graph, yields an empty graph.
pub fn ego_graph(graph: &Graph, center: &EntityKey, depth: usize) -> Graph {
    if depth == 0 || !graph.contains(center) {
        return Graph::default();
    }

    let mut visited: HashSet<EntityKey> = HashSet::new();
    let mut current_level: HashSet<EntityKey> = HashSet::new();
    current_level.insert(*center);
    visited.insert(*center);

    for _ in 0..depth {
        let mut next_level: HashSet<EntityKey> = HashSet::new();
        for edge in &graph.edges {
            if current_level.contains(&edge.source) && !visited.contains(&edge.target) {
                next_level.insert(edge.target);
            }
            if current_level.contains(&edge.target) && !visited.contains(&edge.source) {
                next_level.insert(edge.source);
            }
        }
        if next_level.is_empty() {
            break;
        }
        visited.extend(next_level.iter().copied());
        current_level = next_level;
    }

    let nodes = graph
        .nodes
        .iter()
        .filter(|n| visited.contains(&n.id))
        .cloned()
        .collect();
    let edges = graph
        .edges
        .iter()
        .filter(|e| visited.contains(&e.source) && visited.contains(&e.target))
        .cloned()
        .collect();

    Graph::new(nodes, edges)
}
