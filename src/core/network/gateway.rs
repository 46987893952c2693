//! Read/write contract of the persistence collaborator.
//!
//! The engine never stores records itself. Everything it reads or writes goes
//! through an [`EntityGateway`]; every call is a suspension point.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::network::entity::{
    Business, Connection, EmailAddress, Entity, EntityKey, Location, Person, PhoneNumber,
};
use crate::core::network::relationship::{
    NewRelationship, Relationship, RelationshipFilter, RelationshipType,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The collaborator could not be reached or timed out.
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused the write.
    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Record not found: {0}")]
    MissingRecord(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Persistence operations the network engine depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityGateway: Send + Sync {
    async fn list_people(&self) -> GatewayResult<Vec<Person>>;

    async fn list_businesses(&self) -> GatewayResult<Vec<Business>>;

    async fn list_locations(&self) -> GatewayResult<Vec<Location>>;

    async fn list_phone_numbers(&self) -> GatewayResult<Vec<PhoneNumber>>;

    async fn list_email_addresses(&self) -> GatewayResult<Vec<EmailAddress>>;

    /// Resolve one entity, `None` if it does not exist.
    async fn get_entity(&self, key: EntityKey) -> GatewayResult<Option<Entity>>;

    async fn list_relationships(&self, filter: RelationshipFilter) -> GatewayResult<Vec<Relationship>>;

    async fn create_relationship(&self, payload: NewRelationship) -> GatewayResult<Relationship>;

    async fn delete_relationship(&self, id: String) -> GatewayResult<()>;

    /// Append a connection to a person's own connection list.
    async fn add_connection(&self, person_id: u64, connection: Connection) -> GatewayResult<()>;

    /// Remove the matching connection from a person's list. Returns whether
    /// anything was removed.
    async fn remove_connection(
        &self,
        person_id: u64,
        target_id: u64,
        relationship_type: RelationshipType,
    ) -> GatewayResult<bool>;
}

/// Fetch every entity of every type, people first.
pub async fn fetch_all_entities<G: EntityGateway + ?Sized>(gateway: &G) -> GatewayResult<Vec<Entity>> {
    let mut entities: Vec<Entity> = gateway
        .list_people()
        .await?
        .into_iter()
        .map(Entity::Person)
        .collect();
    entities.extend(gateway.list_businesses().await?.into_iter().map(Entity::Business));
    entities.extend(gateway.list_locations().await?.into_iter().map(Entity::Location));
    entities.extend(gateway.list_phone_numbers().await?.into_iter().map(Entity::Phone));
    entities.extend(gateway.list_email_addresses().await?.into_iter().map(Entity::Email));
    Ok(entities)
}

/// Fetch the records the basic workflow draws: people (with embedded
/// connections) and businesses.
pub async fn fetch_people_and_businesses<G: EntityGateway + ?Sized>(
    gateway: &G,
) -> GatewayResult<Vec<Entity>> {
    let mut entities: Vec<Entity> = gateway
        .list_people()
        .await?
        .into_iter()
        .map(Entity::Person)
        .collect();
    entities.extend(gateway.list_businesses().await?.into_iter().map(Entity::Business));
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_all_orders_people_first() {
        let mut mock = MockEntityGateway::new();
        mock.expect_list_people().returning(|| {
            Ok(vec![Person {
                id: 1,
                first_name: "Alice".into(),
                ..Default::default()
            }])
        });
        mock.expect_list_businesses().returning(|| {
            Ok(vec![Business {
                id: 1,
                name: "Acme".into(),
                ..Default::default()
            }])
        });
        mock.expect_list_locations().returning(|| Ok(vec![]));
        mock.expect_list_phone_numbers().returning(|| Ok(vec![PhoneNumber::default()]));
        mock.expect_list_email_addresses().returning(|| Ok(vec![]));

        let entities = fetch_all_entities(&mock).await.unwrap();
        let keys: Vec<EntityKey> = entities.iter().map(Entity::key).collect();
        assert_eq!(
            keys,
            vec![EntityKey::person(1), EntityKey::business(1), EntityKey::phone(0)]
        );
    }

    #[tokio::test]
    async fn test_fetch_propagates_failure() {
        let mut mock = MockEntityGateway::new();
        mock.expect_list_people()
            .returning(|| Err(GatewayError::Unavailable("timeout".into())));
        let err = fetch_people_and_businesses(&mock).await.unwrap_err();
        assert!(err.is_transient());
    }
}
