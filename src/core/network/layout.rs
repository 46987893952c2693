//! Layout Engine
//!
//! Assigns 2D coordinates to graph nodes. Three interchangeable algorithms:
//!
//! - **Hierarchical**: one horizontal row per entity type, centred.
//! - **Circular**: one ring, one angular sector per entity type.
//! - **Force-directed**: spring/repulsion simulation with damping and a cooling
//!   cap on per-iteration movement; nodes stay on the canvas.
//!
//! Layouts only write `Node::position`; nothing else in the graph changes.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::network::builder::{Graph, Node, Position};
use crate::core::network::entity::{EntityKey, EntityType};

/// Distances below this are treated as this, so coincident nodes do not divide by zero.
const MIN_DISTANCE: f64 = 0.01;

// ============================================================================
// Algorithms
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutAlgorithm {
    Hierarchical,
    Circular,
    #[default]
    #[serde(alias = "force")]
    ForceDirected,
}

impl LayoutAlgorithm {
    pub const ALL: [LayoutAlgorithm; 3] = [
        LayoutAlgorithm::Hierarchical,
        LayoutAlgorithm::Circular,
        LayoutAlgorithm::ForceDirected,
    ];

    /// Next algorithm in [`LayoutAlgorithm::ALL`], wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&a| a == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hierarchical => "hierarchical",
            Self::Circular => "circular",
            Self::ForceDirected => "force",
        }
    }
}

impl fmt::Display for LayoutAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hierarchical" | "hierarchy" => Ok(Self::Hierarchical),
            "circular" | "circle" => Ok(Self::Circular),
            "force" | "force_directed" | "force-directed" => Ok(Self::ForceDirected),
            other => Err(format!("unknown layout algorithm '{other}'")),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Layout parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Vertical distance between hierarchical rows.
    pub layer_height: f64,
    /// Horizontal distance between nodes in a hierarchical row.
    pub node_spacing: f64,
    pub force_iterations: usize,
    /// Velocity multiplier applied every iteration.
    pub damping: f64,
    /// Scale applied to the net force before it is added to velocity.
    pub step: f64,
    /// Seed for initial positions. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Stop early once no node moves more than this in an iteration.
    /// `None` always runs `force_iterations`.
    pub convergence_threshold: Option<f64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1200.0,
            canvas_height: 800.0,
            layer_height: 150.0,
            node_spacing: 120.0,
            force_iterations: 50,
            damping: 0.85,
            step: 0.05,
            seed: None,
            convergence_threshold: None,
        }
    }
}

impl LayoutConfig {
    pub fn center(&self) -> Position {
        Position::new(self.canvas_width / 2.0, self.canvas_height / 2.0)
    }

    /// Reset unusable values to their defaults and return the names of the
    /// fields that were reset.
    ///
    /// Extents and `step` must be finite and positive, `damping` in (0, 1],
    /// and a convergence threshold must not be negative or NaN.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let defaults = Self::default();
        let mut reset = Vec::new();

        for (name, value, default) in [
            ("canvas_width", &mut self.canvas_width, defaults.canvas_width),
            ("canvas_height", &mut self.canvas_height, defaults.canvas_height),
            ("layer_height", &mut self.layer_height, defaults.layer_height),
            ("node_spacing", &mut self.node_spacing, defaults.node_spacing),
            ("step", &mut self.step, defaults.step),
        ] {
            if !is_positive(*value) {
                *value = default;
                reset.push(name);
            }
        }
        if !(is_positive(self.damping) && self.damping <= 1.0) {
            self.damping = defaults.damping;
            reset.push("damping");
        }
        if matches!(self.convergence_threshold, Some(t) if t.is_nan() || t < 0.0) {
            self.convergence_threshold = None;
            reset.push("convergence_threshold");
        }
        reset
    }
}

/// Finite and strictly positive.
pub fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Ring radius for `node_count` nodes: 50 per node, clamped to 300..=600.
pub fn circular_radius(node_count: usize) -> f64 {
    (node_count as f64 * 50.0).clamp(300.0, 600.0)
}

// ============================================================================
// Layout Engine
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(mut config: LayoutConfig) -> Self {
        let reset = config.sanitize();
        if !reset.is_empty() {
            log::warn!("Layout settings reset to defaults: {}", reset.join(", "));
        }
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Write positions for every node of `graph` using `algorithm`.
    pub fn apply(&self, graph: &mut Graph, algorithm: LayoutAlgorithm) {
        if graph.nodes.is_empty() {
            return;
        }
        match algorithm {
            LayoutAlgorithm::Hierarchical => self.hierarchical(&mut graph.nodes),
            LayoutAlgorithm::Circular => self.circular(&mut graph.nodes),
            LayoutAlgorithm::ForceDirected => {
                let edges: Vec<(EntityKey, EntityKey)> =
                    graph.edges.iter().map(|e| (e.source, e.target)).collect();
                self.force_directed(&mut graph.nodes, &edges);
            }
        }
        log::debug!("Applied {algorithm} layout to {} nodes", graph.nodes.len());
    }

    fn hierarchical(&self, nodes: &mut [Node]) {
        let center_x = self.config.canvas_width / 2.0;
        for entity_type in EntityType::ALL {
            let bucket: Vec<usize> = indices_of_type(nodes, entity_type);
            let y = entity_type.bucket_index() as f64 * self.config.layer_height;
            let mid = (bucket.len() as f64 - 1.0) / 2.0;
            for (slot, &idx) in bucket.iter().enumerate() {
                let x = center_x + (slot as f64 - mid) * self.config.node_spacing;
                nodes[idx].position = Some(Position::new(x, y));
            }
        }
    }

    fn circular(&self, nodes: &mut [Node]) {
        let groups: Vec<Vec<usize>> = EntityType::ALL
            .into_iter()
            .map(|t| indices_of_type(nodes, t))
            .filter(|g| !g.is_empty())
            .collect();

        let center = self.config.center();
        let radius = circular_radius(nodes.len());
        let sector = TAU / groups.len() as f64;

        for (g, group) in groups.iter().enumerate() {
            let spacing = sector / group.len() as f64;
            for (slot, &idx) in group.iter().enumerate() {
                let angle = g as f64 * sector + slot as f64 * spacing;
                nodes[idx].position = Some(Position::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                ));
            }
        }
    }

    /// Fruchterman-Reingold style simulation with k = sqrt(area / n),
    /// repulsion k²/d between every pair and attraction d²/k along edges.
    ///
    /// A node moves at most the current temperature per iteration. The
    /// temperature starts at a tenth of the canvas width and cools linearly,
    /// and every node is kept on the canvas.
    fn force_directed(&self, nodes: &mut [Node], edges: &[(EntityKey, EntityKey)]) {
        let cfg = &self.config;
        let n = nodes.len();
        let (width, height) = (cfg.canvas_width.max(0.0), cfg.canvas_height.max(0.0));
        let k = (width * height / n as f64).sqrt().max(MIN_DISTANCE);

        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut coordinate = |max: f64| if max > 0.0 { rng.gen_range(0.0..max) } else { 0.0 };

        let mut pos: Vec<(f64, f64)> = nodes
            .iter()
            .map(|node| match node.position {
                Some(p) if p.x.is_finite() && p.y.is_finite() => (p.x, p.y),
                _ => (coordinate(width), coordinate(height)),
            })
            .collect();
        let mut vel = vec![(0.0_f64, 0.0_f64); n];

        let index: HashMap<EntityKey, usize> =
            nodes.iter().enumerate().map(|(i, node)| (node.id, i)).collect();
        let springs: Vec<(usize, usize)> = edges
            .iter()
            .filter_map(|(s, t)| Some((*index.get(s)?, *index.get(t)?)))
            .filter(|(s, t)| s != t)
            .collect();

        let initial_temperature = width / 10.0;
        let iterations = cfg.force_iterations.max(1) as f64;

        for iteration in 0..cfg.force_iterations {
            let temperature = initial_temperature * (1.0 - iteration as f64 / iterations);
            let mut disp = vec![(0.0_f64, 0.0_f64); n];

            // Repulsion, O(n²)
            for i in 0..n {
                for j in (i + 1)..n {
                    let (mut dx, mut dy) = (pos[i].0 - pos[j].0, pos[i].1 - pos[j].1);
                    if dx.hypot(dy) < MIN_DISTANCE {
                        // Coincident nodes are pushed apart along x.
                        (dx, dy) = (MIN_DISTANCE, 0.0);
                    }
                    let dist = dx.hypot(dy).max(MIN_DISTANCE);
                    let force = k * k / dist;
                    let (fx, fy) = (dx / dist * force, dy / dist * force);
                    disp[i].0 += fx;
                    disp[i].1 += fy;
                    disp[j].0 -= fx;
                    disp[j].1 -= fy;
                }
            }

            // Attraction along edges
            for &(s, t) in &springs {
                let dx = pos[s].0 - pos[t].0;
                let dy = pos[s].1 - pos[t].1;
                let dist = (dx * dx + dy * dy).sqrt().max(MIN_DISTANCE);
                let force = dist * dist / k;
                let (fx, fy) = (dx / dist * force, dy / dist * force);
                disp[s].0 -= fx;
                disp[s].1 -= fy;
                disp[t].0 += fx;
                disp[t].1 += fy;
            }

            let mut max_move = 0.0_f64;
            for i in 0..n {
                let (mut vx, mut vy) = (
                    (vel[i].0 + disp[i].0 * cfg.step) * cfg.damping,
                    (vel[i].1 + disp[i].1 * cfg.step) * cfg.damping,
                );
                let speed = vx.hypot(vy);
                if !speed.is_finite() {
                    (vx, vy) = (0.0, 0.0);
                } else if speed > temperature {
                    let scale = temperature / speed;
                    (vx, vy) = (vx * scale, vy * scale);
                }

                let (old_x, old_y) = pos[i];
                pos[i] = ((old_x + vx).clamp(0.0, width), (old_y + vy).clamp(0.0, height));
                // Velocity lost against the canvas edge does not carry over.
                vel[i] = (pos[i].0 - old_x, pos[i].1 - old_y);
                max_move = max_move.max(vel[i].0.hypot(vel[i].1));
            }

            if let Some(threshold) = cfg.convergence_threshold {
                if max_move < threshold {
                    log::debug!("Force layout converged after {} iterations", iteration + 1);
                    break;
                }
            }
        }

        for (node, (x, y)) in nodes.iter_mut().zip(pos) {
            node.position = Some(Position::new(x, y));
        }
    }
}

fn indices_of_type(nodes: &[Node], entity_type: EntityType) -> Vec<usize> {
    nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.entity_type == entity_type)
        .map(|(i, _)| i)
        .collect()
}

/// Lay out `graph` with default parameters and hand it back.
pub fn layout(mut graph: Graph, algorithm: LayoutAlgorithm) -> Graph {
    LayoutEngine::default().apply(&mut graph, algorithm);
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::network::builder::build_graph;
    use crate::core::network::entity::{Business, Entity, Person};
    use crate::core::network::relationship::{Relationship, RelationshipType};
    use proptest::prelude::*;
    use rstest::rstest;

    fn people(n: u64) -> Vec<Entity> {
        (1..=n)
            .map(|id| {
                Entity::Person(Person {
                    id,
                    first_name: format!("P{id}"),
                    ..Default::default()
                })
            })
            .collect()
    }

    fn mixed_graph() -> Graph {
        let mut entities = people(4);
        entities.push(Entity::Business(Business {
            id: 10,
            name: "Acme".into(),
            ..Default::default()
        }));
        let rels = vec![
            Relationship::new(EntityKey::person(1), EntityKey::person(2), RelationshipType::Friend),
            Relationship::new(EntityKey::person(2), EntityKey::person(3), RelationshipType::Enemy),
            Relationship::new(EntityKey::person(1), EntityKey::business(10), RelationshipType::Owns),
        ];
        build_graph(&entities, &rels)
    }

    fn seeded(seed: u64) -> LayoutEngine {
        LayoutEngine::new(LayoutConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    fn pos(graph: &Graph, key: EntityKey) -> Position {
        graph.node(&key).and_then(|n| n.position).unwrap()
    }

    #[test]
    fn test_parse_algorithm_names() {
        assert_eq!("force".parse::<LayoutAlgorithm>().unwrap(), LayoutAlgorithm::ForceDirected);
        assert_eq!("Circular".parse::<LayoutAlgorithm>().unwrap(), LayoutAlgorithm::Circular);
        assert!("spiral".parse::<LayoutAlgorithm>().is_err());
        assert_eq!(LayoutAlgorithm::ForceDirected.next(), LayoutAlgorithm::Hierarchical);
    }

    #[test]
    fn test_empty_graph_is_noop() {
        let mut graph = Graph::default();
        for algo in LayoutAlgorithm::ALL {
            LayoutEngine::default().apply(&mut graph, algo);
        }
        assert!(graph.nodes.is_empty());
    }

    #[test]
    fn test_hierarchical_rows_by_type() {
        let graph = layout(mixed_graph(), LayoutAlgorithm::Hierarchical);
        let cfg = LayoutConfig::default();

        // Four people centred on row 0, spaced by node_spacing, in input order.
        let xs: Vec<f64> = (1..=4).map(|id| pos(&graph, EntityKey::person(id)).x).collect();
        assert_eq!(xs, vec![420.0, 540.0, 660.0, 780.0]);
        assert!((1..=4).all(|id| pos(&graph, EntityKey::person(id)).y == 0.0));

        // The lone business sits centred on row 1.
        let acme = pos(&graph, EntityKey::business(10));
        assert_eq!(acme, Position::new(cfg.canvas_width / 2.0, cfg.layer_height));
    }

    #[test]
    fn test_circular_two_people_opposite() {
        let graph = build_graph(&people(2), &[]);
        let graph = layout(graph, LayoutAlgorithm::Circular);
        let center = LayoutConfig::default().center();
        let a = pos(&graph, EntityKey::person(1));
        let b = pos(&graph, EntityKey::person(2));
        assert!((a.distance_to(&center) - 300.0).abs() < 1e-9);
        assert!((b.distance_to(&center) - 300.0).abs() < 1e-9);
        // 180 degrees apart means a full diameter between them.
        assert!((a.distance_to(&b) - 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_circular_radius_clamp() {
        assert_eq!(circular_radius(1), 300.0);
        assert_eq!(circular_radius(8), 400.0);
        assert_eq!(circular_radius(50), 600.0);
    }

    #[test]
    fn test_circular_groups_share_sectors() {
        let graph = layout(mixed_graph(), LayoutAlgorithm::Circular);
        let center = LayoutConfig::default().center();
        // Two groups: people fill [0, π), the business starts at π.
        let acme = pos(&graph, EntityKey::business(10));
        let angle = (acme.y - center.y).atan2(acme.x - center.x);
        assert!((angle.abs() - std::f64::consts::PI).abs() < 1e-9);
        for id in 1..=4 {
            let p = pos(&graph, EntityKey::person(id));
            assert!(p.y >= center.y - 1e-9, "person {id} should be in the first half-turn");
        }
    }

    #[test]
    fn test_force_layout_seeded_is_reproducible() {
        let mut a = mixed_graph();
        let mut b = mixed_graph();
        seeded(7).apply(&mut a, LayoutAlgorithm::ForceDirected);
        seeded(7).apply(&mut b, LayoutAlgorithm::ForceDirected);
        for (na, nb) in a.nodes.iter().zip(&b.nodes) {
            let (pa, pb) = (na.position.unwrap(), nb.position.unwrap());
            assert!(pa.distance_to(&pb) < 1e-6);
        }
    }

    #[test]
    fn test_force_layout_separates_nodes() {
        let mut graph = mixed_graph();
        seeded(3).apply(&mut graph, LayoutAlgorithm::ForceDirected);
        let positions: Vec<Position> = graph.nodes.iter().map(|n| n.position.unwrap()).collect();
        for i in 0..positions.len() {
            assert!(positions[i].x.is_finite() && positions[i].y.is_finite());
            for j in (i + 1)..positions.len() {
                assert!(positions[i].distance_to(&positions[j]) > 1.0);
            }
        }
    }

    fn complete_graph(n: u64) -> Graph {
        let mut rels = Vec::new();
        for a in 1..=n {
            for b in (a + 1)..=n {
                rels.push(Relationship::new(
                    EntityKey::person(a),
                    EntityKey::person(b),
                    RelationshipType::Associate,
                ));
            }
        }
        build_graph(&people(n), &rels)
    }

    fn assert_on_canvas(graph: &Graph, cfg: &LayoutConfig) {
        for node in &graph.nodes {
            let p = node.position.unwrap();
            assert!(p.x.is_finite() && p.y.is_finite(), "{} at {p:?}", node.id);
            assert!((0.0..=cfg.canvas_width).contains(&p.x), "{} at {p:?}", node.id);
            assert!((0.0..=cfg.canvas_height).contains(&p.y), "{} at {p:?}", node.id);
        }
    }

    #[test]
    fn test_force_layout_dense_graph_stays_finite() {
        for n in [8, 15, 25] {
            let mut graph = complete_graph(n);
            seeded(3).apply(&mut graph, LayoutAlgorithm::ForceDirected);
            assert_on_canvas(&graph, &LayoutConfig::default());
        }
    }

    #[test]
    fn test_force_layout_path_stays_on_canvas() {
        let rels: Vec<Relationship> = (1..10)
            .map(|id| {
                Relationship::new(EntityKey::person(id), EntityKey::person(id + 1), RelationshipType::Friend)
            })
            .collect();
        let mut graph = build_graph(&people(10), &rels);
        seeded(3).apply(&mut graph, LayoutAlgorithm::ForceDirected);
        assert_on_canvas(&graph, &LayoutConfig::default());
    }

    #[rstest]
    #[case::zero_width(LayoutConfig { canvas_width: 0.0, ..Default::default() })]
    #[case::negative_height(LayoutConfig { canvas_height: -5.0, ..Default::default() })]
    #[case::nan_damping(LayoutConfig { damping: f64::NAN, ..Default::default() })]
    #[case::zero_step(LayoutConfig { step: 0.0, ..Default::default() })]
    fn test_invalid_settings_fall_back(#[case] config: LayoutConfig) {
        let engine = LayoutEngine::new(LayoutConfig {
            seed: Some(5),
            ..config
        });
        assert_eq!(
            engine.config(),
            &LayoutConfig {
                seed: Some(5),
                ..Default::default()
            }
        );
        let mut graph = mixed_graph();
        engine.apply(&mut graph, LayoutAlgorithm::ForceDirected);
        assert_on_canvas(&graph, &LayoutConfig::default());
    }

    #[test]
    fn test_sanitize_reports_reset_fields() {
        let mut config = LayoutConfig {
            canvas_width: f64::INFINITY,
            damping: 1.5,
            convergence_threshold: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(config.sanitize(), vec!["canvas_width", "damping", "convergence_threshold"]);
        assert_eq!(config, LayoutConfig::default());
        assert!(LayoutConfig::default().sanitize().is_empty());
    }

    #[test]
    fn test_force_layout_keeps_existing_positions_as_start() {
        let mut graph = build_graph(&people(1), &[]);
        graph.nodes[0].position = Some(Position::new(10.0, 20.0));
        // A single node feels no force, so it stays where it started.
        seeded(1).apply(&mut graph, LayoutAlgorithm::ForceDirected);
        assert_eq!(graph.nodes[0].position, Some(Position::new(10.0, 20.0)));
    }

    #[test]
    fn test_convergence_threshold_stops_early() {
        let engine = LayoutEngine::new(LayoutConfig {
            seed: Some(11),
            convergence_threshold: Some(f64::INFINITY),
            ..Default::default()
        });
        let full = {
            let mut g = mixed_graph();
            seeded(11).apply(&mut g, LayoutAlgorithm::ForceDirected);
            g
        };
        let mut early = mixed_graph();
        engine.apply(&mut early, LayoutAlgorithm::ForceDirected);
        // One iteration versus fifty from the same seed must differ.
        assert_ne!(
            early.nodes.iter().map(|n| n.position).collect::<Vec<_>>(),
            full.nodes.iter().map(|n| n.position).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_layout_only_touches_positions() {
        let before = mixed_graph();
        let after = layout(before.clone(), LayoutAlgorithm::Hierarchical);
        assert_eq!(before.edges, after.edges);
        for (b, a) in before.nodes.iter().zip(&after.nodes) {
            assert_eq!(b.id, a.id);
            assert_eq!(b.data, a.data);
        }
    }

    proptest! {
        #[test]
        fn prop_force_layout_finite_on_dense_graphs(n in 2u64..=25, seed in any::<u64>()) {
            let mut graph = complete_graph(n);
            seeded(seed).apply(&mut graph, LayoutAlgorithm::ForceDirected);
            let cfg = LayoutConfig::default();
            for node in &graph.nodes {
                let p = node.position.unwrap();
                prop_assert!(p.x.is_finite() && p.y.is_finite());
                prop_assert!((0.0..=cfg.canvas_width).contains(&p.x));
                prop_assert!((0.0..=cfg.canvas_height).contains(&p.y));
            }
        }

        #[test]
        fn prop_deterministic_layouts_repeat_exactly(n in 1u64..30) {
            let graph = build_graph(&people(n), &[]);
            for algo in [LayoutAlgorithm::Hierarchical, LayoutAlgorithm::Circular] {
                let a = layout(graph.clone(), algo);
                let b = layout(graph.clone(), algo);
                let pa: Vec<_> = a.nodes.iter().map(|n| n.position).collect();
                let pb: Vec<_> = b.nodes.iter().map(|n| n.position).collect();
                prop_assert_eq!(pa, pb);
                prop_assert!(a.nodes.iter().all(|n| n.position.is_some()));
            }
        }
    }
}
