//! Node-eligible records: people, businesses, locations, phone numbers and
//! email addresses.
//!
//! Identity is the pair `(EntityType, id)`. Raw ids are only unique within a
//! type, so `person-42` and `business-42` are different nodes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::network::relationship::RelationshipType;

// ============================================================================
// Entity Types
// ============================================================================

/// Type of record that can appear as a node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Business,
    Location,
    #[serde(rename = "phone")]
    PhoneNumber,
    #[serde(rename = "email")]
    EmailAddress,
}

impl EntityType {
    /// All types in bucket order (used by the hierarchical and circular layouts).
    pub const ALL: [EntityType; 5] = [
        EntityType::Person,
        EntityType::Business,
        EntityType::Location,
        EntityType::PhoneNumber,
        EntityType::EmailAddress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Business => "business",
            Self::Location => "location",
            Self::PhoneNumber => "phone",
            Self::EmailAddress => "email",
        }
    }

    /// Position of this type in [`EntityType::ALL`].
    pub fn bucket_index(self) -> usize {
        match self {
            Self::Person => 0,
            Self::Business => 1,
            Self::Location => 2,
            Self::PhoneNumber => 3,
            Self::EmailAddress => 4,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "person" => Ok(Self::Person),
            "business" => Ok(Self::Business),
            "location" => Ok(Self::Location),
            "phone" | "phone_number" => Ok(Self::PhoneNumber),
            "email" | "email_address" => Ok(Self::EmailAddress),
            other => Err(format!("unknown entity type '{other}'")),
        }
    }
}

// ============================================================================
// Entity Key
// ============================================================================

/// Composite node identity. Displays as `"{type}-{id}"`, but is compared and
/// hashed structurally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub id: u64,
}

impl EntityKey {
    pub const fn new(entity_type: EntityType, id: u64) -> Self {
        Self { entity_type, id }
    }

    pub const fn person(id: u64) -> Self {
        Self::new(EntityType::Person, id)
    }

    pub const fn business(id: u64) -> Self {
        Self::new(EntityType::Business, id)
    }

    pub const fn location(id: u64) -> Self {
        Self::new(EntityType::Location, id)
    }

    pub const fn phone(id: u64) -> Self {
        Self::new(EntityType::PhoneNumber, id)
    }

    pub const fn email(id: u64) -> Self {
        Self::new(EntityType::EmailAddress, id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.entity_type, self.id)
    }
}

impl FromStr for EntityKey {
    type Err = String;

    /// Parses `"person-42"`. The id is taken after the last `-`, so type names
    /// never need escaping.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("malformed entity key '{s}'"))?;
        let id = id
            .parse::<u64>()
            .map_err(|e| format!("malformed entity id in '{s}': {e}"))?;
        Ok(Self::new(kind.parse()?, id))
    }
}

// ============================================================================
// Embedded Connections (basic workflow)
// ============================================================================

/// A connection stored on a person record, pointing at another person.
///
/// `target_id` is optional because stored records can be dirty; entries
/// without a target are dropped by the builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    #[serde(default)]
    pub target_id: Option<u64>,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub note: Option<String>,
}

impl Connection {
    pub fn new(target_id: u64, relationship_type: RelationshipType, note: Option<String>) -> Self {
        Self {
            target_id: Some(target_id),
            relationship_type,
            note,
        }
    }

    pub fn points_at(&self, target_id: u64, relationship_type: &RelationshipType) -> bool {
        self.target_id == Some(target_id) && &self.relationship_type == relationship_type
    }
}

// ============================================================================
// Entity Variants
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Person {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Business {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Location {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub location_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PhoneNumber {
    pub id: u64,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub phone_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EmailAddress {
    pub id: u64,
    #[serde(default)]
    pub address: Option<String>,
}

/// Any record that can become a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Entity {
    Person(Person),
    Business(Business),
    Location(Location),
    #[serde(rename = "phone")]
    Phone(PhoneNumber),
    #[serde(rename = "email")]
    Email(EmailAddress),
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Person(_) => EntityType::Person,
            Self::Business(_) => EntityType::Business,
            Self::Location(_) => EntityType::Location,
            Self::Phone(_) => EntityType::PhoneNumber,
            Self::Email(_) => EntityType::EmailAddress,
        }
    }

    pub fn raw_id(&self) -> u64 {
        match self {
            Self::Person(p) => p.id,
            Self::Business(b) => b.id,
            Self::Location(l) => l.id,
            Self::Phone(p) => p.id,
            Self::Email(e) => e.id,
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type(), self.raw_id())
    }

    /// Human-readable label with per-type fallbacks for missing fields.
    pub fn display_label(&self) -> String {
        match self {
            Self::Person(p) => format!("{} {}", p.first_name, p.last_name).trim().to_string(),
            Self::Business(b) => b.name.clone(),
            Self::Location(l) => non_blank(&l.name)
                .or_else(|| non_blank(&l.address))
                .unwrap_or("Unknown Location")
                .to_string(),
            Self::Phone(p) => non_blank(&p.number).unwrap_or("Unknown Phone").to_string(),
            Self::Email(e) => non_blank(&e.address).unwrap_or("Unknown Email").to_string(),
        }
    }

    /// The variant's own fields, flattened for the node data blob.
    pub fn type_specific_attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        let mut put = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                attrs.insert(key.to_string(), v.clone());
            }
        };
        match self {
            Self::Person(p) => {
                put("category", &p.category);
                put("status", &p.status);
            }
            Self::Business(b) => {
                put("industry", &b.industry);
                put("status", &b.status);
            }
            Self::Location(l) => {
                put("address", &l.address);
                put("location_type", &l.location_type);
            }
            Self::Phone(p) => put("phone_type", &p.phone_type),
            Self::Email(_) => {}
        }
        attrs
    }

    pub fn as_person(&self) -> Option<&Person> {
        match self {
            Self::Person(p) => Some(p),
            _ => None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
