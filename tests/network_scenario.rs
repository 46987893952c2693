//! End-to-end tests for the relationship network.
//!
//! These run the public API against the in-memory gateway:
//!
//! - **Pipeline**: build → filter → layout on a small case
//! - **Mirrored connections**: basic-workflow connect/disconnect keeps both
//!   people in agreement, including when the second write fails
//! - **Controller**: the connect and delete flows a user drives from the TUI

use std::sync::Arc;

use case_graph::core::network::{
    build_graph, filter, layout, Business, Dataset, Entity, EntityKey, EntityType, FilterSpec,
    GraphBuilder, LayoutAlgorithm, LayoutConfig, LayoutEngine, MemoryGateway, NetworkController,
    NetworkError, Person, Relationship, RelationshipService, RelationshipType, Workflow,
};

fn alice_bob_acme() -> (Vec<Entity>, Vec<Relationship>) {
    let person = |id, name: &str| {
        Entity::Person(Person {
            id,
            first_name: name.to_string(),
            ..Default::default()
        })
    };
    let entities = vec![
        person(1, "Alice"),
        person(2, "Bob"),
        Entity::Business(Business {
            id: 10,
            name: "Acme".to_string(),
            ..Default::default()
        }),
    ];
    let relationships = vec![
        Relationship::new(EntityKey::person(1), EntityKey::person(2), RelationshipType::Friend),
        Relationship::new(EntityKey::person(1), EntityKey::business(10), RelationshipType::Owns),
    ];
    (entities, relationships)
}

fn has_connection(person: &Person, target: u64, relationship_type: &RelationshipType) -> bool {
    person
        .connections
        .iter()
        .any(|c| c.points_at(target, relationship_type))
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn test_people_only_circle() {
    let (entities, relationships) = alice_bob_acme();
    let graph = build_graph(&entities, &relationships);
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 2);

    let spec = FilterSpec::default().with_types([EntityType::Person]);
    let people = filter(&graph, &spec);
    let labels: Vec<&str> = people.nodes.iter().map(|n| n.label()).collect();
    assert_eq!(labels, ["Alice", "Bob"]);
    assert_eq!(people.edges.len(), 1);
    assert_eq!(people.edges[0].relationship_type, RelationshipType::Friend);

    let laid_out = layout(people, LayoutAlgorithm::Circular);
    let center = LayoutConfig::default().center();
    let a = laid_out.nodes[0].position.unwrap();
    let b = laid_out.nodes[1].position.unwrap();
    assert!((a.distance_to(&center) - 300.0).abs() < 1e-6);
    assert!((b.distance_to(&center) - 300.0).abs() < 1e-6);
    // Opposite ends of the ring.
    assert!((a.distance_to(&b) - 600.0).abs() < 1e-6);
}

#[test]
fn test_fixed_layouts_are_repeatable() {
    let (entities, relationships) = alice_bob_acme();
    let graph = build_graph(&entities, &relationships);
    for algorithm in [LayoutAlgorithm::Hierarchical, LayoutAlgorithm::Circular] {
        let first = layout(graph.clone(), algorithm);
        let second = layout(graph.clone(), algorithm);
        let positions = |g: &case_graph::core::network::Graph| {
            g.nodes.iter().map(|n| n.position).collect::<Vec<_>>()
        };
        assert_eq!(positions(&first), positions(&second), "{algorithm}");
    }
}

// ============================================================================
// Mirrored connections
// ============================================================================

#[tokio::test]
async fn test_connect_then_disconnect_keeps_both_sides() {
    let gateway = Arc::new(MemoryGateway::new(Dataset::demo()));
    let service = RelationshipService::new(Arc::clone(&gateway));

    service
        .connect_people(1, 3, RelationshipType::Family, Some("cousins".to_string()))
        .await
        .unwrap();
    let alice = gateway.person(1).await.unwrap();
    let carol = gateway.person(3).await.unwrap();
    assert!(has_connection(&alice, 3, &RelationshipType::Family));
    assert!(has_connection(&carol, 1, &RelationshipType::Family));

    service
        .disconnect_people(1, 3, RelationshipType::Family)
        .await
        .unwrap();
    let alice = gateway.person(1).await.unwrap();
    let carol = gateway.person(3).await.unwrap();
    assert!(!has_connection(&alice, 3, &RelationshipType::Family));
    assert!(!has_connection(&carol, 1, &RelationshipType::Family));
}

#[tokio::test]
async fn test_failed_second_leg_is_rolled_back() {
    let gateway = Arc::new(MemoryGateway::new(Dataset::demo()));
    let service = RelationshipService::new(Arc::clone(&gateway));
    gateway.fail_connection_writes_for(3).await;

    let err = service
        .connect_people(1, 3, RelationshipType::Associate, None)
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::PartialWrite { compensated: true, .. }));
    assert!(err.is_retryable());
    assert!(!has_connection(&gateway.person(1).await.unwrap(), 3, &RelationshipType::Associate));

    gateway.clear_failures().await;
    service
        .connect_people(1, 3, RelationshipType::Associate, None)
        .await
        .unwrap();
    assert!(has_connection(&gateway.person(3).await.unwrap(), 1, &RelationshipType::Associate));
}

#[tokio::test]
async fn test_second_type_between_connected_people_is_rejected() {
    let gateway = Arc::new(MemoryGateway::new(Dataset::demo()));
    let service = RelationshipService::new(Arc::clone(&gateway));

    // Alice and Bob are already friends in the demo case.
    let err = service
        .connect_people(1, 2, RelationshipType::Family, None)
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::Validation(_)));
    let alice = gateway.person(1).await.unwrap();
    assert_eq!(alice.connections.len(), 1);
    assert!(has_connection(&alice, 2, &RelationshipType::Friend));
}

#[tokio::test]
async fn test_basic_workflow_rejects_suspect() {
    let gateway = Arc::new(MemoryGateway::new(Dataset::demo()));
    let service = RelationshipService::new(Arc::clone(&gateway));
    let err = service
        .connect_people(1, 3, RelationshipType::Suspect, None)
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::Validation(_)));
}

// ============================================================================
// Controller
// ============================================================================

fn controller(gateway: &Arc<MemoryGateway>, workflow: Workflow) -> NetworkController<MemoryGateway> {
    let engine = LayoutEngine::new(LayoutConfig {
        seed: Some(7),
        ..Default::default()
    });
    NetworkController::new(Arc::clone(gateway), workflow, engine, GraphBuilder::default())
        .with_layout(LayoutAlgorithm::Hierarchical)
}

#[tokio::test]
async fn test_enhanced_connect_and_delete() {
    let gateway = Arc::new(MemoryGateway::new(Dataset::demo()));
    let mut controller = controller(&gateway, Workflow::Enhanced);
    controller.refresh().await.unwrap();
    let edges_before = controller.view().edges.len();

    controller.begin_connect();
    controller.on_node_selected(EntityKey::person(2));
    controller.on_node_selected(EntityKey::business(10));
    assert!(controller
        .allowed_types_for_selection()
        .contains(&RelationshipType::CustomerOf));
    controller
        .on_connect_requested(RelationshipType::CustomerOf, None, Some(60))
        .await
        .unwrap();

    assert!(controller.interaction().is_idle());
    assert_eq!(controller.view().edges.len(), edges_before + 1);
    let edge_id = controller
        .view()
        .outgoing(&EntityKey::person(2))
        .find(|e| e.relationship_type == RelationshipType::CustomerOf)
        .map(|e| e.id.clone())
        .unwrap();
    assert_eq!(controller.view().edge(&edge_id).unwrap().confidence(), 60);

    controller.on_edge_delete_requested(&edge_id).await.unwrap();
    assert_eq!(controller.view().edges.len(), edges_before);
    assert_eq!(gateway.snapshot().await.relationships.len(), edges_before);
}

#[tokio::test]
async fn test_basic_connect_draws_one_edge() {
    let gateway = Arc::new(MemoryGateway::new(Dataset::demo()));
    let mut controller = controller(&gateway, Workflow::Basic);
    controller.refresh().await.unwrap();

    controller.begin_connect();
    controller.on_node_selected(EntityKey::person(2));
    controller.on_node_selected(EntityKey::person(3));
    controller
        .on_connect_requested(RelationshipType::Enemy, None, None)
        .await
        .unwrap();

    let enemy_edges = controller
        .view()
        .edges
        .iter()
        .filter(|e| e.relationship_type == RelationshipType::Enemy)
        .count();
    assert_eq!(enemy_edges, 1);
    assert!(has_connection(&gateway.person(3).await.unwrap(), 2, &RelationshipType::Enemy));
}

#[tokio::test]
async fn test_filter_hides_low_confidence_edges() {
    let gateway = Arc::new(MemoryGateway::new(Dataset::demo()));
    let mut controller = controller(&gateway, Workflow::Enhanced);
    controller.refresh().await.unwrap();

    // Carol's only edge is works_at at 40%.
    controller.set_filter(FilterSpec::default().with_min_confidence(50).with_isolated(false));
    assert!(!controller.view().contains(&EntityKey::person(3)));

    controller.set_filter(FilterSpec::default().with_min_confidence(50));
    assert!(controller.view().contains(&EntityKey::person(3)));
    assert_eq!(controller.view().edges_of(&EntityKey::person(3)).count(), 0);
}
