//! Bridges a rendering layer to the engine.
//!
//! The controller owns the [`GraphStore`] holding the latest full graph and
//! derives the visible view from it: filter first, then layout. UI events
//! come in through the `on_*` handlers; every successful mutation is followed
//! by a refresh from the gateway.

use std::sync::Arc;

use tracing::instrument;

use crate::core::network::builder::{BuildOutput, BuildReport, EdgeId, Graph, GraphBuilder};
use crate::core::network::entity::{EntityKey, EntityType};
use crate::core::network::error::{NetworkError, Result};
use crate::core::network::filter::{filter, FilterSpec};
use crate::core::network::gateway::{fetch_all_entities, fetch_people_and_businesses, EntityGateway};
use crate::core::network::interaction::{InteractionMachine, InteractionState};
use crate::core::network::layout::{LayoutAlgorithm, LayoutEngine};
use crate::core::network::mutation::{CreateRequest, RelationshipService};
use crate::core::network::relationship::{
    allowed_types, RelationshipFilter, RelationshipType, Workflow,
};
use crate::core::network::store::{GraphStore, RequestToken};

pub struct NetworkController<G: EntityGateway + ?Sized> {
    gateway: Arc<G>,
    service: RelationshipService<G>,
    builder: GraphBuilder,
    engine: LayoutEngine,
    workflow: Workflow,
    algorithm: LayoutAlgorithm,
    filter: FilterSpec,
    store: GraphStore,
    view: Graph,
    interaction: InteractionMachine,
}

impl<G: EntityGateway + ?Sized> NetworkController<G> {
    pub fn new(gateway: Arc<G>, workflow: Workflow, engine: LayoutEngine, builder: GraphBuilder) -> Self {
        let service = RelationshipService::new(Arc::clone(&gateway))
            .with_default_confidence(builder.default_confidence);
        Self {
            gateway,
            service,
            builder,
            engine,
            workflow,
            algorithm: LayoutAlgorithm::default(),
            filter: FilterSpec::default(),
            store: GraphStore::new(),
            view: Graph::default(),
            interaction: InteractionMachine::new(),
        }
    }

    pub fn with_layout(mut self, algorithm: LayoutAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The filtered, laid-out graph to render.
    pub fn view(&self) -> &Graph {
        &self.view
    }

    /// The unfiltered graph from the last accepted fetch.
    pub fn full_graph(&self) -> &Graph {
        self.store.graph()
    }

    pub fn report(&self) -> &BuildReport {
        self.store.report()
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow
    }

    pub fn layout_algorithm(&self) -> LayoutAlgorithm {
        self.algorithm
    }

    pub fn filter_spec(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn interaction(&self) -> InteractionState {
        self.interaction.state()
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// Fetch, rebuild and re-derive the view. Returns whether the result was
    /// installed.
    #[instrument(skip(self), fields(workflow = %self.workflow))]
    pub async fn refresh(&mut self) -> Result<bool> {
        let token = self.begin_refresh();
        let output = self.fetch_graph().await?;
        Ok(self.finish_refresh(token, output))
    }

    /// Issue the token for a fetch that is about to start.
    pub fn begin_refresh(&mut self) -> RequestToken {
        self.store.begin_request()
    }

    /// Fetch and build without touching controller state.
    pub async fn fetch_graph(&self) -> Result<BuildOutput> {
        let output = match self.workflow {
            Workflow::Basic => {
                let entities = fetch_people_and_businesses(self.gateway.as_ref()).await?;
                self.builder.build_basic(&entities)
            }
            Workflow::Enhanced => {
                let entities = fetch_all_entities(self.gateway.as_ref()).await?;
                let relationships = self
                    .gateway
                    .list_relationships(RelationshipFilter::default())
                    .await?;
                self.builder.build(&entities, &relationships)
            }
        };
        Ok(output)
    }

    /// Install a fetched graph unless a newer one was already installed.
    pub fn finish_refresh(&mut self, token: RequestToken, output: BuildOutput) -> bool {
        let BuildOutput { graph, report } = output;
        if !report.is_clean() {
            log::warn!("Graph built with {} data integrity warnings", report.warnings.len());
        }
        if !self.store.commit(token, graph, report) {
            return false;
        }
        self.rederive();
        log::debug!(
            "Graph refreshed: {} nodes, {} edges visible",
            self.view.nodes.len(),
            self.view.edges.len()
        );
        true
    }

    // ========================================================================
    // View settings
    // ========================================================================

    pub fn set_layout(&mut self, algorithm: LayoutAlgorithm) {
        self.algorithm = algorithm;
        self.engine.apply(&mut self.view, algorithm);
    }

    pub fn set_filter(&mut self, spec: FilterSpec) {
        self.filter = spec;
        self.rederive();
    }

    fn rederive(&mut self) {
        let mut view = filter(self.store.graph(), &self.filter);
        self.engine.apply(&mut view, self.algorithm);
        self.view = view;

        // Selections that left the view are dropped.
        if self
            .interaction
            .state()
            .selection()
            .iter()
            .any(|key| !self.view.contains(key))
        {
            self.interaction.cancel();
            self.interaction.begin();
        }
    }

    // ========================================================================
    // Interaction
    // ========================================================================

    pub fn begin_connect(&mut self) {
        self.interaction.begin();
    }

    pub fn cancel_connect(&mut self) {
        self.interaction.cancel();
    }

    /// Node click. Keys not in the current view are ignored.
    pub fn on_node_selected(&mut self, key: EntityKey) -> InteractionState {
        if !self.view.contains(&key) {
            log::debug!("Ignoring selection of {key}: not in view");
            return self.interaction.state();
        }
        self.interaction.toggle(key)
    }

    /// Relationship types offered for the current pair, empty until two
    /// nodes are selected.
    pub fn allowed_types_for_selection(&self) -> &'static [RelationshipType] {
        match self.interaction.state().pair() {
            Some((first, second)) => allowed_types(self.workflow, first.entity_type, second.entity_type),
            None => &[],
        }
    }

    /// Connect the selected pair. On failure the selection is kept so the
    /// action can be retried.
    ///
    /// Once the write has gone through the call succeeds. The returned flag
    /// says whether the view was refreshed afterwards; `false` leaves the
    /// previous view in place.
    #[instrument(skip(self, note))]
    pub async fn on_connect_requested(
        &mut self,
        relationship_type: RelationshipType,
        note: Option<String>,
        confidence: Option<u8>,
    ) -> Result<bool> {
        let Some((source, target)) = self.interaction.state().pair() else {
            return Err(NetworkError::Validation(
                "select two entities before connecting".to_string(),
            ));
        };

        match self.workflow {
            Workflow::Basic => {
                if source.entity_type != EntityType::Person || target.entity_type != EntityType::Person {
                    return Err(NetworkError::Validation(
                        "basic connections are between people only".to_string(),
                    ));
                }
                self.service
                    .connect_people(source.id, target.id, relationship_type, note)
                    .await?;
            }
            Workflow::Enhanced => {
                let mut request = CreateRequest::new(source, target, relationship_type);
                request.note = note;
                request.confidence = confidence;
                self.service.create_relationship(request).await?;
            }
        }

        self.interaction.complete();
        Ok(self.refresh_after_write().await)
    }

    /// Delete the relationship drawn as `edge_id`. Returns whether the view
    /// was refreshed after the delete.
    #[instrument(skip(self))]
    pub async fn on_edge_delete_requested(&mut self, edge_id: &EdgeId) -> Result<bool> {
        let edge = self
            .store
            .graph()
            .edge(edge_id)
            .cloned()
            .ok_or_else(|| NetworkError::NotFound(format!("edge {edge_id}")))?;

        match self.workflow {
            Workflow::Basic => {
                self.service
                    .disconnect_people(edge.source.id, edge.target.id, edge.relationship_type)
                    .await?
            }
            Workflow::Enhanced => {
                self.service
                    .delete_relationship(edge.source, edge.target, edge.relationship_type)
                    .await?
            }
        }

        Ok(self.refresh_after_write().await)
    }

    /// Refresh following a successful write. A failure here must not turn
    /// the write into an error.
    async fn refresh_after_write(&mut self) -> bool {
        match self.refresh().await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Write succeeded but the view could not be refreshed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::network::entity::{Business, Connection, Entity, Person};
    use crate::core::network::gateway::{GatewayError, MockEntityGateway};
    use crate::core::network::layout::LayoutConfig;
    use crate::core::network::relationship::Relationship;

    fn scenario_mock() -> MockEntityGateway {
        let mut mock = MockEntityGateway::new();
        mock.expect_list_people().returning(|| {
            Ok(vec![
                Person {
                    id: 1,
                    first_name: "Alice".into(),
                    connections: vec![Connection::new(2, RelationshipType::Friend, None)],
                    ..Default::default()
                },
                Person {
                    id: 2,
                    first_name: "Bob".into(),
                    ..Default::default()
                },
            ])
        });
        mock.expect_list_businesses().returning(|| {
            Ok(vec![Business {
                id: 10,
                name: "Acme".into(),
                ..Default::default()
            }])
        });
        mock.expect_list_locations().returning(|| Ok(vec![]));
        mock.expect_list_phone_numbers().returning(|| Ok(vec![]));
        mock.expect_list_email_addresses().returning(|| Ok(vec![]));
        mock.expect_list_relationships().returning(|_| {
            Ok(vec![
                Relationship::new(EntityKey::person(1), EntityKey::person(2), RelationshipType::Friend),
                Relationship::new(EntityKey::person(1), EntityKey::business(10), RelationshipType::Owns),
            ])
        });
        mock
    }

    fn controller(mock: MockEntityGateway, workflow: Workflow) -> NetworkController<MockEntityGateway> {
        let engine = LayoutEngine::new(LayoutConfig {
            seed: Some(7),
            ..Default::default()
        });
        NetworkController::new(Arc::new(mock), workflow, engine, GraphBuilder::default())
    }

    #[tokio::test]
    async fn test_refresh_enhanced_builds_positioned_view() {
        let mut ctl = controller(scenario_mock(), Workflow::Enhanced);
        assert!(ctl.refresh().await.unwrap());
        assert_eq!(ctl.view().nodes.len(), 3);
        assert_eq!(ctl.view().edges.len(), 2);
        assert!(ctl.view().nodes.iter().all(|n| n.position.is_some()));
    }

    #[tokio::test]
    async fn test_refresh_basic_uses_embedded_connections() {
        let mut ctl = controller(scenario_mock(), Workflow::Basic);
        ctl.refresh().await.unwrap();
        assert_eq!(ctl.view().nodes.len(), 3);
        assert_eq!(ctl.view().edges.len(), 1);
        assert_eq!(ctl.view().edges[0].relationship_type, RelationshipType::Friend);
    }

    #[tokio::test]
    async fn test_stale_fetch_is_discarded() {
        let mut ctl = controller(scenario_mock(), Workflow::Enhanced);
        let older = ctl.begin_refresh();
        let newer = ctl.begin_refresh();
        let fresh = ctl.fetch_graph().await.unwrap();
        assert!(ctl.finish_refresh(newer, fresh));
        let stale = BuildOutput {
            graph: Graph::default(),
            report: BuildReport::default(),
        };
        assert!(!ctl.finish_refresh(older, stale));
        assert_eq!(ctl.view().nodes.len(), 3);
    }

    #[tokio::test]
    async fn test_filter_rederives_without_fetch() {
        let mut ctl = controller(scenario_mock(), Workflow::Enhanced);
        ctl.refresh().await.unwrap();

        ctl.set_filter(FilterSpec::default().with_types([EntityType::Person]));
        assert_eq!(ctl.view().nodes.len(), 2);
        assert_eq!(ctl.full_graph().nodes.len(), 3);

        ctl.set_layout(LayoutAlgorithm::Circular);
        let a = ctl.view().nodes[0].position.unwrap();
        let b = ctl.view().nodes[1].position.unwrap();
        assert!((a.distance_to(&b) - 600.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_connect_requires_pair() {
        let mut ctl = controller(scenario_mock(), Workflow::Enhanced);
        ctl.refresh().await.unwrap();
        ctl.begin_connect();
        ctl.on_node_selected(EntityKey::person(1));
        let err = ctl
            .on_connect_requested(RelationshipType::Friend, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::Validation(_)));
    }

    #[tokio::test]
    async fn test_allowed_types_follow_selection() {
        let mut ctl = controller(scenario_mock(), Workflow::Enhanced);
        ctl.refresh().await.unwrap();
        assert!(ctl.allowed_types_for_selection().is_empty());
        ctl.begin_connect();
        ctl.on_node_selected(EntityKey::business(10));
        ctl.on_node_selected(EntityKey::person(2));
        assert!(ctl
            .allowed_types_for_selection()
            .contains(&RelationshipType::Employs));
    }

    #[tokio::test]
    async fn test_selection_outside_view_ignored() {
        let mut ctl = controller(scenario_mock(), Workflow::Enhanced);
        ctl.refresh().await.unwrap();
        ctl.begin_connect();
        let state = ctl.on_node_selected(EntityKey::person(99));
        assert_eq!(state, InteractionState::Selecting { selected: None });
    }

    #[tokio::test]
    async fn test_failed_connect_keeps_selection() {
        let mut mock = scenario_mock();
        mock.expect_get_entity().returning(|key| {
            Ok(Some(Entity::Person(Person {
                id: key.id,
                ..Default::default()
            })))
        });
        mock.expect_add_connection()
            .returning(|_, _| Err(GatewayError::Unavailable("down".into())));
        let mut ctl = controller(mock, Workflow::Basic);
        ctl.refresh().await.unwrap();
        ctl.begin_connect();
        ctl.on_node_selected(EntityKey::person(1));
        ctl.on_node_selected(EntityKey::person(2));

        let err = ctl
            .on_connect_requested(RelationshipType::Enemy, None, None)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(ctl.interaction().pair(), Some((EntityKey::person(1), EntityKey::person(2))));
    }

    #[tokio::test]
    async fn test_connect_succeeds_when_refresh_after_write_fails() {
        let mut mock = MockEntityGateway::new();
        let mut calls = 0;
        mock.expect_list_people().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(vec![Person {
                    id: 1,
                    first_name: "Alice".into(),
                    ..Default::default()
                }])
            } else {
                Err(GatewayError::Unavailable("blip".into()))
            }
        });
        mock.expect_list_businesses().returning(|| {
            Ok(vec![Business {
                id: 10,
                name: "Acme".into(),
                ..Default::default()
            }])
        });
        mock.expect_list_locations().returning(|| Ok(vec![]));
        mock.expect_list_phone_numbers().returning(|| Ok(vec![]));
        mock.expect_list_email_addresses().returning(|| Ok(vec![]));
        mock.expect_list_relationships().returning(|_| Ok(vec![]));
        mock.expect_get_entity().returning(|key| {
            Ok(Some(match key.entity_type {
                EntityType::Business => Entity::Business(Business {
                    id: key.id,
                    ..Default::default()
                }),
                _ => Entity::Person(Person {
                    id: key.id,
                    ..Default::default()
                }),
            }))
        });
        mock.expect_create_relationship()
            .times(1)
            .returning(|payload| Ok(payload.into_relationship()));

        let mut ctl = controller(mock, Workflow::Enhanced);
        ctl.refresh().await.unwrap();
        ctl.begin_connect();
        ctl.on_node_selected(EntityKey::person(1));
        ctl.on_node_selected(EntityKey::business(10));

        let refreshed = ctl
            .on_connect_requested(RelationshipType::Owns, None, None)
            .await
            .unwrap();
        assert!(!refreshed);
        assert!(ctl.interaction().is_idle());
        // The previous view is kept.
        assert_eq!(ctl.view().nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_unknown_edge() {
        let mut ctl = controller(scenario_mock(), Workflow::Enhanced);
        ctl.refresh().await.unwrap();
        let err = ctl
            .on_edge_delete_requested(&EdgeId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::NotFound(_)));
    }
}
