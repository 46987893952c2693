//! In-memory [`EntityGateway`] backed by a JSON dataset.
//!
//! Used by the terminal viewer and the integration tests. Connection writes
//! for chosen people can be made to fail, to exercise mirrored-write recovery.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::network::entity::{
    Business, Connection, EmailAddress, Entity, EntityKey, EntityType, Location, Person,
    PhoneNumber,
};
use crate::core::network::gateway::{EntityGateway, GatewayError, GatewayResult};
use crate::core::network::relationship::{
    NewRelationship, Relationship, RelationshipFilter, RelationshipType,
};

/// Everything a gateway serves, in one serialisable bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub people: Vec<Person>,
    pub businesses: Vec<Business>,
    pub locations: Vec<Location>,
    pub phone_numbers: Vec<PhoneNumber>,
    pub email_addresses: Vec<EmailAddress>,
    pub relationships: Vec<Relationship>,
}

impl Dataset {
    /// Load a dataset from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading dataset {}", path.display()))?;
        let dataset: Dataset = serde_json::from_str(&contents)
            .with_context(|| format!("parsing dataset {}", path.display()))?;
        log::info!(
            "Loaded dataset from {}: {} people, {} businesses, {} relationships",
            path.display(),
            dataset.people.len(),
            dataset.businesses.len(),
            dataset.relationships.len()
        );
        Ok(dataset)
    }

    /// Small built-in case file for trying the viewer without a dataset.
    pub fn demo() -> Self {
        let person = |id, first: &str, last: &str, connections| Person {
            id,
            first_name: first.into(),
            last_name: last.into(),
            category: Some("subject".into()),
            status: Some("active".into()),
            connections,
        };
        let people = vec![
            person(1, "Alice", "Moreau", vec![Connection::new(2, RelationshipType::Friend, None)]),
            person(2, "Bob", "Tanaka", vec![Connection::new(1, RelationshipType::Friend, None)]),
            person(3, "Carol", "Diaz", vec![]),
        ];
        let businesses = vec![Business {
            id: 10,
            name: "Acme Freight".into(),
            industry: Some("Logistics".into()),
            status: Some("active".into()),
        }];
        let locations = vec![Location {
            id: 20,
            name: None,
            address: Some("14 Harbour Rd".into()),
            location_type: Some("warehouse".into()),
        }];
        let phone_numbers = vec![PhoneNumber {
            id: 30,
            number: Some("+1 555 0100".into()),
            phone_type: Some("mobile".into()),
        }];
        let email_addresses = vec![EmailAddress {
            id: 40,
            address: Some("dispatch@acme.example".into()),
        }];
        let relationships = vec![
            Relationship::new(EntityKey::person(1), EntityKey::person(2), RelationshipType::Friend)
                .with_confidence(90),
            Relationship::new(EntityKey::person(1), EntityKey::business(10), RelationshipType::Owns),
            Relationship::new(EntityKey::person(3), EntityKey::business(10), RelationshipType::WorksAt)
                .with_confidence(40),
            Relationship::new(EntityKey::business(10), EntityKey::location(20), RelationshipType::LocatedAt),
            Relationship::new(EntityKey::person(2), EntityKey::phone(30), RelationshipType::UsesPhone)
                .with_note("burner, seen twice"),
            Relationship::new(EntityKey::business(10), EntityKey::email(40), RelationshipType::UsesEmail),
        ];
        Self {
            people,
            businesses,
            locations,
            phone_numbers,
            email_addresses,
            relationships,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryGateway {
    data: RwLock<Dataset>,
    /// People whose connection list rejects writes.
    failing_people: RwLock<HashSet<u64>>,
}

impl MemoryGateway {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
            failing_people: RwLock::new(HashSet::new()),
        }
    }

    /// Make connection writes on `person_id` fail until cleared.
    pub async fn fail_connection_writes_for(&self, person_id: u64) {
        self.failing_people.write().await.insert(person_id);
    }

    pub async fn clear_failures(&self) {
        self.failing_people.write().await.clear();
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> Dataset {
        self.data.read().await.clone()
    }

    pub async fn person(&self, id: u64) -> Option<Person> {
        self.data.read().await.people.iter().find(|p| p.id == id).cloned()
    }

    async fn check_writable(&self, person_id: u64) -> GatewayResult<()> {
        if self.failing_people.read().await.contains(&person_id) {
            return Err(GatewayError::Unavailable(format!(
                "connection store for person-{person_id} is unavailable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityGateway for MemoryGateway {
    async fn list_people(&self) -> GatewayResult<Vec<Person>> {
        Ok(self.data.read().await.people.clone())
    }

    async fn list_businesses(&self) -> GatewayResult<Vec<Business>> {
        Ok(self.data.read().await.businesses.clone())
    }

    async fn list_locations(&self) -> GatewayResult<Vec<Location>> {
        Ok(self.data.read().await.locations.clone())
    }

    async fn list_phone_numbers(&self) -> GatewayResult<Vec<PhoneNumber>> {
        Ok(self.data.read().await.phone_numbers.clone())
    }

    async fn list_email_addresses(&self) -> GatewayResult<Vec<EmailAddress>> {
        Ok(self.data.read().await.email_addresses.clone())
    }

    async fn get_entity(&self, key: EntityKey) -> GatewayResult<Option<Entity>> {
        let data = self.data.read().await;
        let id = key.id;
        let found = match key.entity_type {
            EntityType::Person => data.people.iter().find(|e| e.id == id).cloned().map(Entity::Person),
            EntityType::Business => data
                .businesses
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .map(Entity::Business),
            EntityType::Location => data
                .locations
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .map(Entity::Location),
            EntityType::PhoneNumber => data
                .phone_numbers
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .map(Entity::Phone),
            EntityType::EmailAddress => data
                .email_addresses
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .map(Entity::Email),
        };
        Ok(found)
    }

    async fn list_relationships(&self, filter: RelationshipFilter) -> GatewayResult<Vec<Relationship>> {
        Ok(self
            .data
            .read()
            .await
            .relationships
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn create_relationship(&self, payload: NewRelationship) -> GatewayResult<Relationship> {
        let relationship = payload.into_relationship();
        self.data
            .write()
            .await
            .relationships
            .push(relationship.clone());
        Ok(relationship)
    }

    async fn delete_relationship(&self, id: String) -> GatewayResult<()> {
        let mut data = self.data.write().await;
        let pos = data
            .relationships
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| GatewayError::MissingRecord(format!("relationship {id}")))?;
        data.relationships.remove(pos);
        Ok(())
    }

    async fn add_connection(&self, person_id: u64, connection: Connection) -> GatewayResult<()> {
        self.check_writable(person_id).await?;
        let mut data = self.data.write().await;
        let person = data
            .people
            .iter_mut()
            .find(|p| p.id == person_id)
            .ok_or_else(|| GatewayError::MissingRecord(format!("person-{person_id}")))?;
        person.connections.push(connection);
        Ok(())
    }

    async fn remove_connection(
        &self,
        person_id: u64,
        target_id: u64,
        relationship_type: RelationshipType,
    ) -> GatewayResult<bool> {
        self.check_writable(person_id).await?;
        let mut data = self.data.write().await;
        let person = data
            .people
            .iter_mut()
            .find(|p| p.id == person_id)
            .ok_or_else(|| GatewayError::MissingRecord(format!("person-{person_id}")))?;
        let before = person.connections.len();
        person
            .connections
            .retain(|c| !c.points_at(target_id, &relationship_type));
        let removed = person.connections.len() != before;
        if removed {
            log::debug!(
                "Removed {relationship_type} connection person-{person_id} -> person-{target_id} at {}",
                Utc::now()
            );
        }
        Ok(removed)
    }
}
