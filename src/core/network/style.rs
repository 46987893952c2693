//! Static style tables for nodes and edges.
//!
//! Edge styles are resolved from the relationship type alone, so the same
//! input always renders the same way. Unknown types fall back to a neutral
//! "Connected" style.

use serde::{Deserialize, Serialize};

use crate::core::network::entity::EntityType;
use crate::core::network::relationship::{RelationshipType, StyleHint};

/// A row of the edge style table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub color: &'static str,
    pub width: f32,
    pub dash: Option<&'static str>,
    pub label: &'static str,
}

const fn style(color: &'static str, width: f32, dash: Option<&'static str>, label: &'static str) -> EdgeStyle {
    EdgeStyle {
        color,
        width,
        dash,
        label,
    }
}

/// Fallback for types missing from the table.
pub const OTHER_STYLE: EdgeStyle = style("#6b7280", 1.0, Some("2 2"), "Connected");

/// Look up the style for a relationship type.
pub fn edge_style(relationship_type: &RelationshipType) -> EdgeStyle {
    use RelationshipType::*;

    match relationship_type {
        Family => style("#8b5cf6", 3.0, None, "Family"),
        Friend => style("#22c55e", 2.0, None, "Friend"),
        Associate => style("#3b82f6", 2.0, Some("6 3"), "Associate"),
        Enemy => style("#ef4444", 2.5, None, "Enemy"),
        Suspect => style("#dc2626", 2.5, Some("4 2"), "Suspect"),
        Owns => style("#f59e0b", 3.0, None, "Owns"),
        WorksAt => style("#0ea5e9", 2.0, None, "Works At"),
        DirectorOf => style("#d97706", 2.5, None, "Director Of"),
        CustomerOf => style("#14b8a6", 1.5, Some("6 3"), "Customer Of"),
        Employs => style("#0ea5e9", 2.0, None, "Employs"),
        OwnedBy => style("#f59e0b", 3.0, None, "Owned By"),
        HasDirector => style("#d97706", 2.5, None, "Has Director"),
        HasCustomer => style("#14b8a6", 1.5, Some("6 3"), "Has Customer"),
        PartnerOf => style("#6366f1", 2.0, None, "Partner Of"),
        SubsidiaryOf => style("#a855f7", 2.0, None, "Subsidiary Of"),
        SupplierOf => style("#84cc16", 1.5, Some("6 3"), "Supplier Of"),
        LivesAt => style("#10b981", 2.0, None, "Lives At"),
        OwnsProperty => style("#059669", 2.5, None, "Owns Property"),
        Frequents => style("#34d399", 1.5, Some("4 4"), "Frequents"),
        LocatedAt => style("#10b981", 2.0, None, "Located At"),
        UsesPhone => style("#f97316", 1.5, Some("2 4"), "Uses Phone"),
        UsesEmail => style("#ec4899", 1.5, Some("2 4"), "Uses Email"),
        Other(_) => OTHER_STYLE,
    }
}

/// Colour hint for a node of the given type.
pub fn node_color(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Person => "#3b82f6",       // blue
        EntityType::Business => "#f59e0b",     // amber
        EntityType::Location => "#10b981",     // emerald
        EntityType::PhoneNumber => "#f97316",  // orange
        EntityType::EmailAddress => "#ec4899", // pink
    }
}

/// Resolved style attached to an edge, after applying any per-record hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderStyle {
    pub color: String,
    pub width: f32,
    pub dash: Option<String>,
    pub label: String,
    /// False for symmetric types, which render without an arrowhead.
    pub directed: bool,
}

impl RenderStyle {
    pub fn resolve(relationship_type: &RelationshipType, hint: Option<&StyleHint>) -> Self {
        let base = edge_style(relationship_type);
        let color = hint
            .and_then(|h| h.color.clone())
            .unwrap_or_else(|| base.color.to_string());
        let dash = hint
            .and_then(|h| h.dash.clone())
            .or_else(|| base.dash.map(str::to_string));
        Self {
            color,
            width: base.width,
            dash,
            label: base.label.to_string(),
            directed: !relationship_type.is_symmetric(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_falls_back_to_connected() {
        let style = RenderStyle::resolve(&RelationshipType::from("rival_gang"), None);
        assert_eq!(style.label, "Connected");
        assert_eq!(style.color, OTHER_STYLE.color);
        assert!(style.directed);
    }

    #[test]
    fn test_style_is_deterministic() {
        let a = RenderStyle::resolve(&RelationshipType::Owns, None);
        let b = RenderStyle::resolve(&RelationshipType::Owns, None);
        assert_eq!(a, b);
        assert_eq!(a.label, "Owns");
    }

    #[test]
    fn test_hint_overrides_color_and_dash_only() {
        let hint = StyleHint {
            color: Some("#000000".into()),
            dash: None,
        };
        let style = RenderStyle::resolve(&RelationshipType::Associate, Some(&hint));
        assert_eq!(style.color, "#000000");
        assert_eq!(style.dash.as_deref(), Some("6 3"));
        assert_eq!(style.width, 2.0);
    }

    #[test]
    fn test_symmetric_types_are_undirected() {
        assert!(!RenderStyle::resolve(&RelationshipType::Friend, None).directed);
        assert!(RenderStyle::resolve(&RelationshipType::WorksAt, None).directed);
    }
}
