//! Entity Relationship Network Engine
//!
//! Turns people, businesses, locations, phone numbers and email addresses,
//! together with their typed connections, into a renderable graph; lays it
//! out in 2D; derives filtered views; and mediates edits so that mirrored
//! person connections stay consistent.
//!
//! # Architecture
//!
//! ```text
//!   EntityGateway ──fetch──> GraphBuilder ──> GraphStore
//!        ^                                        │
//!        │                                  filter │ layout
//!        │                                        v
//!   RelationshipService <── NetworkController ──> view (Graph)
//!                               ^
//!                               │ on_node_selected / on_connect_requested
//!                          InteractionMachine
//! ```
//!
//! # Workflows
//!
//! | Workflow | Source of edges | Vocabulary | Writes |
//! |----------|-----------------|------------|--------|
//! | `basic` | `connections` embedded on people | person→person only | mirrored on both people |
//! | `enhanced` | independent relationship records | per ordered type pair | one record |
//!
//! # Module Structure
//!
//! - [`entity`]: entity variants and composite keys
//! - [`relationship`]: relationship records and per-workflow vocabularies
//! - [`style`]: edge and node style tables
//! - [`builder`]: graph types and construction
//! - [`layout`]: hierarchical, circular and force-directed layouts
//! - [`filter`]: filtered and neighbourhood views
//! - [`store`]: request-sequenced graph holder
//! - [`gateway`]: persistence collaborator contract
//! - [`memory`]: in-memory gateway
//! - [`mutation`]: validated relationship writes
//! - [`interaction`]: connect-mode selection state
//! - [`controller`]: event handlers for a rendering layer

// ============================================================================
// Module Declarations
// ============================================================================

pub mod builder;
pub mod controller;
pub mod entity;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod interaction;
pub mod layout;
pub mod memory;
pub mod mutation;
pub mod relationship;
pub mod store;
pub mod style;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{
    build_graph, BuildOutput, BuildReport, Edge, EdgeData, EdgeId, Graph, GraphBuilder,
    GraphStats, Node, NodeData, Position,
};
pub use controller::NetworkController;
pub use entity::{
    Business, Connection, EmailAddress, Entity, EntityKey, EntityType, Location, Person,
    PhoneNumber,
};
pub use error::{DataIntegrityWarning, NetworkError, Result, WarningKind};
pub use filter::{ego_graph, filter, FilterSpec};
pub use gateway::{EntityGateway, GatewayError, GatewayResult};
pub use interaction::{InteractionMachine, InteractionState};
pub use layout::{layout, LayoutAlgorithm, LayoutConfig, LayoutEngine};
pub use memory::{Dataset, MemoryGateway};
pub use mutation::{CreateRequest, RelationshipService};
pub use relationship::{
    allowed_types, NewRelationship, Relationship, RelationshipFilter, RelationshipType,
    StyleHint, Workflow,
};
pub use store::{GraphStore, RequestToken};
pub use style::{edge_style, node_color, EdgeStyle, RenderStyle};
