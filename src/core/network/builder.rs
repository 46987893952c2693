//! Graph Builder
//!
//! Turns entity and relationship records into a typed node/edge graph.
//! Building is best-effort: records that cannot be placed are dropped and
//! reported as [`DataIntegrityWarning`]s instead of failing the build.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::network::entity::{Entity, EntityKey, EntityType};
use crate::core::network::error::{DataIntegrityWarning, WarningKind};
use crate::core::network::relationship::{
    Relationship, RelationshipType, DEFAULT_CONFIDENCE, MAX_CONFIDENCE,
};
use crate::core::network::style::{node_color, RenderStyle};

// ============================================================================
// Graph Types
// ============================================================================

/// 2D coordinates written by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Shared, read-only payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub label: String,
    pub attributes: std::collections::BTreeMap<String, String>,
    pub color: &'static str,
    /// Degree in the full graph.
    pub connection_count: usize,
    /// Degree is more than twice the average.
    pub is_hub: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: EntityKey,
    pub entity_type: EntityType,
    /// Unset until a layout runs.
    pub position: Option<Position>,
    pub data: Arc<NodeData>,
}

impl Node {
    pub fn label(&self) -> &str {
        &self.data.label
    }
}

/// Edge identifier. Relationship ids in the enhanced workflow, a canonical
/// `source:target:type` string in the basic workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub String);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Shared, read-only payload of an edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub note: Option<String>,
    pub confidence: u8,
    /// Backing relationship record, if any.
    pub relationship_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: EntityKey,
    pub target: EntityKey,
    pub relationship_type: RelationshipType,
    pub render_style: RenderStyle,
    pub data: Arc<EdgeData>,
}

impl Edge {
    pub fn confidence(&self) -> u8 {
        self.data.confidence
    }

    pub fn touches(&self, key: &EntityKey) -> bool {
        &self.source == key || &self.target == key
    }
}

/// Statistics about a graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub entity_type_counts: HashMap<String, usize>,
    pub relationship_type_counts: HashMap<String, usize>,
    /// Up to five (label, degree) pairs, most connected first.
    pub most_connected_entities: Vec<(String, usize)>,
}

impl GraphStats {
    pub fn compute(nodes: &[Node], edges: &[Edge]) -> Self {
        let mut entity_type_counts: HashMap<String, usize> = HashMap::new();
        let mut relationship_type_counts: HashMap<String, usize> = HashMap::new();

        for node in nodes {
            *entity_type_counts
                .entry(node.entity_type.to_string())
                .or_insert(0) += 1;
        }
        for edge in edges {
            *relationship_type_counts
                .entry(edge.relationship_type.to_string())
                .or_insert(0) += 1;
        }

        let degrees = degree_map(edges);
        let mut ranked: Vec<(String, usize)> = nodes
            .iter()
            .map(|n| (n.label().to_string(), degrees.get(&n.id).copied().unwrap_or(0)))
            .filter(|(_, degree)| *degree > 0)
            .collect();
        // Stable sort keeps input order among equal degrees.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(5);

        Self {
            node_count: nodes.len(),
            edge_count: edges.len(),
            entity_type_counts,
            relationship_type_counts,
            most_connected_entities: ranked,
        }
    }
}

fn degree_map(edges: &[Edge]) -> HashMap<EntityKey, usize> {
    let mut degrees = HashMap::new();
    for edge in edges {
        *degrees.entry(edge.source).or_insert(0) += 1;
        *degrees.entry(edge.target).or_insert(0) += 1;
    }
    degrees
}

/// Renderable graph. Derived per request, never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub stats: GraphStats,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let stats = GraphStats::compute(&nodes, &edges);
        Self {
            nodes,
            edges,
            stats,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, key: &EntityKey) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == key)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.node(key).is_some()
    }

    /// Edges with `key` at either end.
    pub fn edges_of<'a>(&'a self, key: &'a EntityKey) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(key))
    }

    pub fn outgoing<'a>(&'a self, key: &'a EntityKey) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.source == key)
    }
}

// ============================================================================
// Build Output
// ============================================================================

/// Records dropped while building.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub warnings: Vec<DataIntegrityWarning>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    fn push(&mut self, kind: WarningKind, subject: impl Into<String>, detail: impl Into<String>) {
        self.warnings
            .push(DataIntegrityWarning::new(kind, subject, detail));
    }
}

#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub graph: Graph,
    pub report: BuildReport,
}

// ============================================================================
// Graph Builder
// ============================================================================

/// Builds graphs from records. Stateless apart from its settings.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    /// Confidence for basic-workflow connections, which carry none of their own.
    pub default_confidence: u8,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }
}

/// Node data before degrees are known.
struct PendingNode {
    id: EntityKey,
    label: String,
    attributes: std::collections::BTreeMap<String, String>,
}

impl GraphBuilder {
    pub fn new(default_confidence: u8) -> Self {
        Self {
            default_confidence: default_confidence.min(MAX_CONFIDENCE),
        }
    }

    /// Enhanced workflow: nodes from `entities`, one edge per relationship
    /// whose endpoints both exist. Multiple typed edges between the same pair
    /// are kept.
    pub fn build(&self, entities: &[Entity], relationships: &[Relationship]) -> BuildOutput {
        let mut report = BuildReport::default();
        let pending = self.collect_nodes(entities, &mut report);
        let present: HashSet<EntityKey> = pending.iter().map(|n| n.id).collect();

        let mut edges = Vec::with_capacity(relationships.len());
        for rel in relationships {
            if let Some(missing) = [rel.source, rel.target]
                .into_iter()
                .find(|k| !present.contains(k))
            {
                report.push(
                    WarningKind::DanglingReference,
                    &rel.id,
                    format!("endpoint {missing} is not loaded"),
                );
                continue;
            }
            edges.push(Edge {
                id: EdgeId(rel.id.clone()),
                source: rel.source,
                target: rel.target,
                relationship_type: rel.relationship_type.clone(),
                render_style: RenderStyle::resolve(&rel.relationship_type, rel.style_hint.as_ref()),
                data: Arc::new(EdgeData {
                    note: rel.note.clone(),
                    confidence: rel.confidence.min(MAX_CONFIDENCE),
                    relationship_id: Some(rel.id.clone()),
                    created_at: Some(rel.created_at),
                }),
            });
        }

        self.finish(pending, edges, report)
    }

    /// Basic workflow: edges come from the `connections` embedded on person
    /// records. A connection and its mirror on the other person collapse into
    /// one edge, keyed by the sorted pair of person ids.
    pub fn build_basic(&self, entities: &[Entity]) -> BuildOutput {
        let mut report = BuildReport::default();
        let pending = self.collect_nodes(entities, &mut report);
        let present: HashSet<EntityKey> = pending.iter().map(|n| n.id).collect();

        let mut seen_pairs: HashSet<(u64, u64)> = HashSet::new();
        let mut edges = Vec::new();

        for person in entities.iter().filter_map(Entity::as_person) {
            let source = EntityKey::person(person.id);
            for (idx, conn) in person.connections.iter().enumerate() {
                let Some(target_id) = conn.target_id else {
                    report.push(
                        WarningKind::MalformedConnection,
                        format!("{source}#{idx}"),
                        "connection has no target id",
                    );
                    continue;
                };
                let target = EntityKey::person(target_id);
                if target == source {
                    report.push(
                        WarningKind::SelfReference,
                        format!("{source}#{idx}"),
                        "connection points at its owner",
                    );
                    continue;
                }
                if !present.contains(&target) {
                    report.push(
                        WarningKind::DanglingReference,
                        format!("{source}#{idx}"),
                        format!("target {target} is not loaded"),
                    );
                    continue;
                }

                let pair = (person.id.min(target_id), person.id.max(target_id));
                if !seen_pairs.insert(pair) {
                    log::debug!("Skipping mirrored connection {source} -> {target}");
                    continue;
                }

                edges.push(Edge {
                    id: basic_edge_id(source, target, &conn.relationship_type),
                    source,
                    target,
                    relationship_type: conn.relationship_type.clone(),
                    render_style: RenderStyle::resolve(&conn.relationship_type, None),
                    data: Arc::new(EdgeData {
                        note: conn.note.clone(),
                        confidence: self.default_confidence,
                        relationship_id: None,
                        created_at: None,
                    }),
                });
            }
        }

        self.finish(pending, edges, report)
    }

    fn collect_nodes(&self, entities: &[Entity], report: &mut BuildReport) -> Vec<PendingNode> {
        let mut seen = HashSet::with_capacity(entities.len());
        let mut pending = Vec::with_capacity(entities.len());
        for entity in entities {
            let key = entity.key();
            if !seen.insert(key) {
                report.push(
                    WarningKind::DuplicateEntity,
                    key.to_string(),
                    "entity listed more than once; keeping the first",
                );
                continue;
            }
            pending.push(PendingNode {
                id: key,
                label: entity.display_label(),
                attributes: entity.type_specific_attributes(),
            });
        }
        pending
    }

    fn finish(&self, pending: Vec<PendingNode>, edges: Vec<Edge>, report: BuildReport) -> BuildOutput {
        let degrees = degree_map(&edges);
        let avg_connections = if pending.is_empty() {
            0.0
        } else {
            degrees.values().sum::<usize>() as f64 / pending.len() as f64
        };

        let nodes = pending
            .into_iter()
            .map(|p| {
                let count = degrees.get(&p.id).copied().unwrap_or(0);
                Node {
                    id: p.id,
                    entity_type: p.id.entity_type,
                    position: None,
                    data: Arc::new(NodeData {
                        label: p.label,
                        attributes: p.attributes,
                        color: node_color(p.id.entity_type),
                        connection_count: count,
                        is_hub: count > 0 && count as f64 > avg_connections * 2.0,
                    }),
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Built graph: {} nodes, {} edges, {} warnings",
            nodes.len(),
            edges.len(),
            report.warnings.len()
        );

        BuildOutput {
            graph: Graph::new(nodes, edges),
            report,
        }
    }
}

/// Canonical id of a basic-workflow edge.
pub fn basic_edge_id(source: EntityKey, target: EntityKey, relationship_type: &RelationshipType) -> EdgeId {
    EdgeId(format!("{source}:{target}:{relationship_type}"))
}

/// Build an enhanced-workflow graph with default settings.
pub fn build_graph(entities: &[Entity], relationships: &[Relationship]) -> Graph {
    GraphBuilder::default().build(entities, relationships).graph
}
