//! Typed, directed relationships and the per-workflow vocabularies that say
//! which types are allowed between which entity types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::network::entity::{EntityKey, EntityType};

/// Confidence assigned when the caller does not supply one.
pub const DEFAULT_CONFIDENCE: u8 = 75;

/// Upper bound of the confidence scale.
pub const MAX_CONFIDENCE: u8 = 100;

// ============================================================================
// Workflows
// ============================================================================

/// Which relationship model is in use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    /// Person-only connections embedded on each person record.
    Basic,
    /// Independent relationship records between any entity types.
    #[default]
    Enhanced,
}

impl Workflow {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Enhanced => "enhanced",
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Relationship Types
// ============================================================================

/// Type of relationship between two entities.
///
/// Stored as a snake_case string. Strings outside the known vocabulary are
/// kept as `Other` so dirty data can still be rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum RelationshipType {
    // person -> person
    Family,
    Friend,
    Associate,
    Enemy,
    Suspect,

    // person -> business
    Owns,
    WorksAt,
    DirectorOf,
    CustomerOf,

    // business -> person
    Employs,
    OwnedBy,
    HasDirector,
    HasCustomer,

    // business -> business
    PartnerOf,
    SubsidiaryOf,
    SupplierOf,

    // -> location
    LivesAt,
    OwnsProperty,
    Frequents,
    LocatedAt,

    // -> phone / email
    UsesPhone,
    UsesEmail,

    /// Anything not in the vocabulary.
    Other(String),
}

impl RelationshipType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Family => "family",
            Self::Friend => "friend",
            Self::Associate => "associate",
            Self::Enemy => "enemy",
            Self::Suspect => "suspect",
            Self::Owns => "owns",
            Self::WorksAt => "works_at",
            Self::DirectorOf => "director_of",
            Self::CustomerOf => "customer_of",
            Self::Employs => "employs",
            Self::OwnedBy => "owned_by",
            Self::HasDirector => "has_director",
            Self::HasCustomer => "has_customer",
            Self::PartnerOf => "partner_of",
            Self::SubsidiaryOf => "subsidiary_of",
            Self::SupplierOf => "supplier_of",
            Self::LivesAt => "lives_at",
            Self::OwnsProperty => "owns_property",
            Self::Frequents => "frequents",
            Self::LocatedAt => "located_at",
            Self::UsesPhone => "uses_phone",
            Self::UsesEmail => "uses_email",
            Self::Other(s) => s,
        }
    }

    /// Whether swapping source and target leaves the meaning unchanged.
    pub fn is_symmetric(&self) -> bool {
        matches!(
            self,
            Self::Family
                | Self::Friend
                | Self::Associate
                | Self::Enemy
                | Self::Suspect
                | Self::PartnerOf
        )
    }
}

impl From<String> for RelationshipType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "family" => Self::Family,
            "friend" => Self::Friend,
            "associate" => Self::Associate,
            "enemy" => Self::Enemy,
            "suspect" => Self::Suspect,
            "owns" => Self::Owns,
            "works_at" => Self::WorksAt,
            "director_of" => Self::DirectorOf,
            "customer_of" => Self::CustomerOf,
            "employs" => Self::Employs,
            "owned_by" => Self::OwnedBy,
            "has_director" => Self::HasDirector,
            "has_customer" => Self::HasCustomer,
            "partner_of" => Self::PartnerOf,
            "subsidiary_of" => Self::SubsidiaryOf,
            "supplier_of" => Self::SupplierOf,
            "lives_at" => Self::LivesAt,
            "owns_property" => Self::OwnsProperty,
            "frequents" => Self::Frequents,
            "located_at" => Self::LocatedAt,
            "uses_phone" => Self::UsesPhone,
            "uses_email" => Self::UsesEmail,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for RelationshipType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<RelationshipType> for String {
    fn from(t: RelationshipType) -> Self {
        match t {
            RelationshipType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Vocabularies
// ============================================================================

use RelationshipType as R;

const BASIC_PERSON_PERSON: &[RelationshipType] = &[R::Family, R::Friend, R::Associate, R::Enemy];

const PERSON_PERSON: &[RelationshipType] =
    &[R::Family, R::Friend, R::Associate, R::Enemy, R::Suspect];
const PERSON_BUSINESS: &[RelationshipType] =
    &[R::Owns, R::WorksAt, R::DirectorOf, R::CustomerOf];
const BUSINESS_PERSON: &[RelationshipType] =
    &[R::Employs, R::OwnedBy, R::HasDirector, R::HasCustomer];
const BUSINESS_BUSINESS: &[RelationshipType] = &[R::PartnerOf, R::SubsidiaryOf, R::SupplierOf];
const PERSON_LOCATION: &[RelationshipType] = &[R::LivesAt, R::OwnsProperty, R::Frequents];
const BUSINESS_LOCATION: &[RelationshipType] = &[R::LocatedAt, R::OwnsProperty];
const ANY_PHONE: &[RelationshipType] = &[R::UsesPhone];
const ANY_EMAIL: &[RelationshipType] = &[R::UsesEmail];
const NONE: &[RelationshipType] = &[];

/// Relationship types allowed from `source` to `target` in `workflow`.
///
/// The two workflows keep separate closed sets: the basic workflow only knows
/// person-to-person connections and does not include `suspect`.
pub fn allowed_types(
    workflow: Workflow,
    source: EntityType,
    target: EntityType,
) -> &'static [RelationshipType] {
    use EntityType::*;

    match workflow {
        Workflow::Basic => match (source, target) {
            (Person, Person) => BASIC_PERSON_PERSON,
            _ => NONE,
        },
        Workflow::Enhanced => match (source, target) {
            (Person, Person) => PERSON_PERSON,
            (Person, Business) => PERSON_BUSINESS,
            (Business, Person) => BUSINESS_PERSON,
            (Business, Business) => BUSINESS_BUSINESS,
            (Person, Location) => PERSON_LOCATION,
            (Business, Location) => BUSINESS_LOCATION,
            (Person | Business | Location, PhoneNumber) => ANY_PHONE,
            (Person | Business | Location, EmailAddress) => ANY_EMAIL,
            _ => NONE,
        },
    }
}

pub fn is_allowed(
    workflow: Workflow,
    source: EntityType,
    target: EntityType,
    relationship_type: &RelationshipType,
) -> bool {
    allowed_types(workflow, source, target).contains(relationship_type)
}

// ============================================================================
// Relationship Records
// ============================================================================

/// Per-relationship visual override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StyleHint {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub dash: Option<String>,
}

/// A stored relationship (enhanced workflow).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub source: EntityKey,
    pub target: EntityKey,
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: u8,
    #[serde(default)]
    pub style_hint: Option<StyleHint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_confidence() -> u8 {
    DEFAULT_CONFIDENCE
}

impl Relationship {
    pub fn new(source: EntityKey, target: EntityKey, relationship_type: RelationshipType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            source,
            target,
            relationship_type,
            note: None,
            confidence: DEFAULT_CONFIDENCE,
            style_hint: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set confidence (clamped to 100)
    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence.min(MAX_CONFIDENCE);
        self
    }

    /// Builder: set note
    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn with_style_hint(mut self, hint: StyleHint) -> Self {
        self.style_hint = Some(hint);
        self
    }

    pub fn involves(&self, key: &EntityKey) -> bool {
        &self.source == key || &self.target == key
    }
}

/// Payload for creating a relationship; the collaborator assigns id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRelationship {
    pub source: EntityKey,
    pub target: EntityKey,
    pub relationship_type: RelationshipType,
    pub note: Option<String>,
    pub confidence: u8,
    pub style_hint: Option<StyleHint>,
}

impl NewRelationship {
    pub fn into_relationship(self) -> Relationship {
        let mut rel = Relationship::new(self.source, self.target, self.relationship_type)
            .with_confidence(self.confidence);
        rel.note = self.note;
        rel.style_hint = self.style_hint;
        rel
    }
}

/// Query for `list_relationships`. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipFilter {
    /// Either endpoint equals this key.
    pub involving: Option<EntityKey>,
    pub source: Option<EntityKey>,
    pub target: Option<EntityKey>,
    pub relationship_type: Option<RelationshipType>,
}

impl RelationshipFilter {
    /// Exact (source, target, type) lookup.
    pub fn triple(source: EntityKey, target: EntityKey, relationship_type: RelationshipType) -> Self {
        Self {
            involving: None,
            source: Some(source),
            target: Some(target),
            relationship_type: Some(relationship_type),
        }
    }

    pub fn involving(key: EntityKey) -> Self {
        Self {
            involving: Some(key),
            ..Default::default()
        }
    }

    pub fn matches(&self, rel: &Relationship) -> bool {
        self.involving.as_ref().map_or(true, |k| rel.involves(k))
            && self.source.as_ref().map_or(true, |k| &rel.source == k)
            && self.target.as_ref().map_or(true, |k| &rel.target == k)
            && self
                .relationship_type
                .as_ref()
                .map_or(true, |t| &rel.relationship_type == t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_unknown_type_round_trips_verbatim() {
        let t = RelationshipType::from("Nemesis");
        assert_eq!(t, RelationshipType::Other("Nemesis".into()));
        assert_eq!(String::from(t), "Nemesis");
    }

    #[test]
    fn test_known_type_parse_is_case_insensitive() {
        assert_eq!(RelationshipType::from("WORKS_AT"), RelationshipType::WorksAt);
        let json = serde_json::to_string(&RelationshipType::DirectorOf).unwrap();
        assert_eq!(json, "\"director_of\"");
    }

    #[rstest]
    #[case(EntityType::Person, EntityType::Business, RelationshipType::Owns, true)]
    #[case(EntityType::Business, EntityType::Person, RelationshipType::Owns, false)]
    #[case(EntityType::Business, EntityType::Person, RelationshipType::OwnedBy, true)]
    #[case(EntityType::Person, EntityType::Location, RelationshipType::LivesAt, true)]
    #[case(EntityType::Location, EntityType::Person, RelationshipType::LivesAt, false)]
    #[case(EntityType::Business, EntityType::PhoneNumber, RelationshipType::UsesPhone, true)]
    #[case(EntityType::Person, EntityType::EmailAddress, RelationshipType::UsesPhone, false)]
    #[case(EntityType::PhoneNumber, EntityType::Person, RelationshipType::UsesPhone, false)]
    #[case(EntityType::Person, EntityType::Person, RelationshipType::Suspect, true)]
    fn test_enhanced_vocabulary(
        #[case] source: EntityType,
        #[case] target: EntityType,
        #[case] rel: RelationshipType,
        #[case] allowed: bool,
    ) {
        assert_eq!(is_allowed(Workflow::Enhanced, source, target, &rel), allowed);
    }

    #[test]
    fn test_basic_vocabulary_is_separate() {
        let basic = allowed_types(Workflow::Basic, EntityType::Person, EntityType::Person);
        assert_eq!(basic.len(), 4);
        assert!(!basic.contains(&RelationshipType::Suspect));
        assert!(allowed_types(Workflow::Basic, EntityType::Person, EntityType::Business).is_empty());
    }

    #[test]
    fn test_filter_matching() {
        let rel = Relationship::new(
            EntityKey::person(1),
            EntityKey::business(10),
            RelationshipType::Owns,
        );
        assert!(RelationshipFilter::default().matches(&rel));
        assert!(RelationshipFilter::involving(EntityKey::business(10)).matches(&rel));
        assert!(!RelationshipFilter::involving(EntityKey::person(10)).matches(&rel));
        assert!(RelationshipFilter::triple(
            EntityKey::person(1),
            EntityKey::business(10),
            RelationshipType::Owns
        )
        .matches(&rel));
        assert!(!RelationshipFilter::triple(
            EntityKey::person(1),
            EntityKey::business(10),
            RelationshipType::WorksAt
        )
        .matches(&rel));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let rel = Relationship::new(EntityKey::person(1), EntityKey::person(2), RelationshipType::Friend)
            .with_confidence(250);
        assert_eq!(rel.confidence, 100);
    }

    #[test]
    fn test_missing_confidence_defaults_to_75() {
        let json = r#"{"id":"r1","source":{"entity_type":"person","id":1},
            "target":{"entity_type":"business","id":10},"relationship_type":"owns",
            "created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}"#;
        let rel: Relationship = serde_json::from_str(json).unwrap();
        assert_eq!(rel.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(rel.relationship_type, RelationshipType::Owns);
    }
}
