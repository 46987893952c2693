//! Relationship Mutation Service
//!
//! Validates and applies relationship writes. The enhanced workflow writes
//! independent relationship records; the basic workflow mirrors every
//! person-to-person connection onto both people's own connection lists.
//!
//! The mirrored write is two gateway calls. If the second fails, the first is
//! rolled back and the caller gets [`NetworkError::PartialWrite`] with the
//! outcome of that rollback.

use std::sync::Arc;

use tracing::instrument;

use crate::core::network::entity::{Connection, EntityKey, Person};
use crate::core::network::error::{NetworkError, Result};
use crate::core::network::gateway::EntityGateway;
use crate::core::network::relationship::{
    allowed_types, NewRelationship, Relationship, RelationshipFilter, RelationshipType, StyleHint,
    Workflow, DEFAULT_CONFIDENCE, MAX_CONFIDENCE,
};

/// Everything needed to create one enhanced relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub source: EntityKey,
    pub target: EntityKey,
    pub relationship_type: RelationshipType,
    pub note: Option<String>,
    /// `None` uses the service default.
    pub confidence: Option<u8>,
    pub style_hint: Option<StyleHint>,
}

impl CreateRequest {
    pub fn new(source: EntityKey, target: EntityKey, relationship_type: RelationshipType) -> Self {
        Self {
            source,
            target,
            relationship_type,
            note: None,
            confidence: None,
            style_hint: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

pub struct RelationshipService<G: EntityGateway + ?Sized> {
    gateway: Arc<G>,
    default_confidence: u8,
}

impl<G: EntityGateway + ?Sized> Clone for RelationshipService<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            default_confidence: self.default_confidence,
        }
    }
}

impl<G: EntityGateway + ?Sized> RelationshipService<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            default_confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn with_default_confidence(mut self, confidence: u8) -> Self {
        self.default_confidence = confidence.min(MAX_CONFIDENCE);
        self
    }

    // ========================================================================
    // Enhanced workflow
    // ========================================================================

    /// Create an independent relationship record.
    ///
    /// Fails with `Validation` when the type is outside the vocabulary for the
    /// ordered pair of entity types, when either endpoint does not exist, for
    /// self-relationships, out-of-range confidence, or an existing identical
    /// (source, target, type) record.
    pub async fn create_relationship(&self, request: CreateRequest) -> Result<Relationship> {
        let CreateRequest {
            source,
            target,
            relationship_type,
            note,
            confidence,
            style_hint,
        } = request;

        validate_pair(Workflow::Enhanced, source, target, &relationship_type)?;
        let confidence = confidence.unwrap_or(self.default_confidence);
        if confidence > MAX_CONFIDENCE {
            return Err(NetworkError::Validation(format!(
                "confidence {confidence} is outside 0-{MAX_CONFIDENCE}"
            )));
        }

        self.require_entity(source).await?;
        self.require_entity(target).await?;

        let existing = self
            .gateway
            .list_relationships(RelationshipFilter::triple(source, target, relationship_type.clone()))
            .await?;
        if !existing.is_empty() {
            return Err(NetworkError::Validation(format!(
                "{source} already has a {relationship_type} relationship to {target}"
            )));
        }

        let created = self
            .gateway
            .create_relationship(NewRelationship {
                source,
                target,
                relationship_type,
                note,
                confidence,
                style_hint,
            })
            .await?;
        log::info!(
            "Created relationship {} ({} -[{}]-> {})",
            created.id,
            created.source,
            created.relationship_type,
            created.target
        );
        Ok(created)
    }

    /// Delete the relationship identified by the triple.
    pub async fn delete_relationship(
        &self,
        source: EntityKey,
        target: EntityKey,
        relationship_type: RelationshipType,
    ) -> Result<()> {
        let matches = self
            .gateway
            .list_relationships(RelationshipFilter::triple(source, target, relationship_type.clone()))
            .await?;
        let Some(found) = matches.into_iter().next() else {
            return Err(NetworkError::NotFound(format!(
                "no {relationship_type} relationship from {source} to {target}"
            )));
        };

        self.gateway.delete_relationship(found.id.clone()).await?;
        log::info!("Deleted relationship {} ({source} -[{relationship_type}]-> {target})", found.id);
        Ok(())
    }

    // ========================================================================
    // Basic workflow (mirrored person connections)
    // ========================================================================

    /// Record a connection on both people.
    #[instrument(skip(self, note))]
    pub async fn connect_people(
        &self,
        a: u64,
        b: u64,
        relationship_type: RelationshipType,
        note: Option<String>,
    ) -> Result<()> {
        validate_pair(
            Workflow::Basic,
            EntityKey::person(a),
            EntityKey::person(b),
            &relationship_type,
        )?;
        let first = self.require_person(a).await?;
        let second = self.require_person(b).await?;

        // At most one connection per pair, whatever its type or direction.
        let existing = first
            .connections
            .iter()
            .find(|c| c.target_id == Some(b))
            .or_else(|| second.connections.iter().find(|c| c.target_id == Some(a)));
        if let Some(existing) = existing {
            return Err(NetworkError::Validation(format!(
                "person-{a} and person-{b} are already connected as {}",
                existing.relationship_type
            )));
        }

        self.gateway
            .add_connection(a, Connection::new(b, relationship_type.clone(), note.clone()))
            .await?;

        if let Err(source) = self
            .gateway
            .add_connection(b, Connection::new(a, relationship_type.clone(), note))
            .await
        {
            let compensated = match self.gateway.remove_connection(a, b, relationship_type.clone()).await {
                Ok(_) => true,
                Err(e) => {
                    log::error!("Rollback of person-{a} -> person-{b} failed: {e}");
                    false
                }
            };
            log::warn!(
                "Mirrored {relationship_type} connection person-{a} <-> person-{b} failed on second leg (compensated: {compensated})"
            );
            return Err(NetworkError::PartialWrite {
                completed: format!("person-{a} -> person-{b}"),
                failed: format!("person-{b} -> person-{a}"),
                compensated,
                source,
            });
        }

        log::info!("Connected person-{a} <-> person-{b} as {relationship_type}");
        Ok(())
    }

    /// Remove a connection from both people.
    ///
    /// Succeeds when at least one side holds it, which also repairs records
    /// left one-sided by earlier failures.
    #[instrument(skip(self))]
    pub async fn disconnect_people(
        &self,
        a: u64,
        b: u64,
        relationship_type: RelationshipType,
    ) -> Result<()> {
        let first = self.require_person(a).await?;
        let second = self.require_person(b).await?;

        let held_by_first = first
            .connections
            .iter()
            .find(|c| c.points_at(b, &relationship_type))
            .cloned();
        let held_by_second = second
            .connections
            .iter()
            .any(|c| c.points_at(a, &relationship_type));

        if held_by_first.is_none() && !held_by_second {
            return Err(NetworkError::NotFound(format!(
                "no {relationship_type} connection between person-{a} and person-{b}"
            )));
        }

        if held_by_first.is_some() {
            self.gateway
                .remove_connection(a, b, relationship_type.clone())
                .await?;
        }

        if held_by_second {
            if let Err(source) = self
                .gateway
                .remove_connection(b, a, relationship_type.clone())
                .await
            {
                // Nothing was removed from person-a, so there is nothing to restore.
                let Some(connection) = held_by_first else {
                    return Err(source.into());
                };
                let compensated = match self.gateway.add_connection(a, connection).await {
                    Ok(()) => true,
                    Err(e) => {
                        log::error!("Restoring person-{a} -> person-{b} failed: {e}");
                        false
                    }
                };
                return Err(NetworkError::PartialWrite {
                    completed: format!("remove person-{a} -> person-{b}"),
                    failed: format!("remove person-{b} -> person-{a}"),
                    compensated,
                    source,
                });
            }
        }

        log::info!("Disconnected person-{a} <-> person-{b} ({relationship_type})");
        Ok(())
    }

    async fn require_entity(&self, key: EntityKey) -> Result<()> {
        match self.gateway.get_entity(key).await? {
            Some(_) => Ok(()),
            None => Err(NetworkError::Validation(format!("{key} does not exist"))),
        }
    }

    async fn require_person(&self, id: u64) -> Result<Person> {
        let key = EntityKey::person(id);
        match self.gateway.get_entity(key).await? {
            Some(entity) => entity
                .as_person()
                .cloned()
                .ok_or_else(|| NetworkError::Validation(format!("{key} is not a person"))),
            None => Err(NetworkError::Validation(format!("{key} does not exist"))),
        }
    }
}

/// Checks that need no gateway round trip.
fn validate_pair(
    workflow: Workflow,
    source: EntityKey,
    target: EntityKey,
    relationship_type: &RelationshipType,
) -> Result<()> {
    if source == target {
        return Err(NetworkError::Validation(format!(
            "{source} cannot be related to itself"
        )));
    }
    let allowed = allowed_types(workflow, source.entity_type, target.entity_type);
    if !allowed.contains(relationship_type) {
        let names: Vec<&str> = allowed.iter().map(RelationshipType::as_str).collect();
        return Err(NetworkError::Validation(format!(
            "'{relationship_type}' is not allowed from {} to {} (allowed: {})",
            source.entity_type,
            target.entity_type,
            if names.is_empty() { "none".to_string() } else { names.join(", ") }
        )));
    }
    Ok(())
}
