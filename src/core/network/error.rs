//! Error taxonomy for the relationship network engine.
//!
//! Builder and layout problems never surface here: they are recorded as
//! [`DataIntegrityWarning`]s and the offending element is dropped. Everything
//! in [`NetworkError`] aborts the operation that raised it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::network::gateway::GatewayError;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum NetworkError {
    /// Rejected before any write was attempted.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The second leg of a mirrored write failed after the first succeeded.
    #[error("Partial write: '{completed}' succeeded but '{failed}' failed (compensated: {compensated})")]
    PartialWrite {
        completed: String,
        failed: String,
        compensated: bool,
        #[source]
        source: GatewayError,
    },

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl NetworkError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::PartialWrite { .. } => true,
            Self::Gateway(e) => e.is_transient(),
            Self::Validation(_) | Self::NotFound(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;

// ============================================================================
// Data Integrity Warnings
// ============================================================================

/// What was wrong with a dropped input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A relationship endpoint is not in the entity set.
    DanglingReference,
    /// An embedded connection has no target id.
    MalformedConnection,
    /// A connection points back at its own owner.
    SelfReference,
    /// The same entity appeared twice in the input.
    DuplicateEntity,
}

/// A record the builder skipped. Rendering continues without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIntegrityWarning {
    pub kind: WarningKind,
    /// The record (entity key or relationship id) the warning is about.
    pub subject: String,
    pub detail: String,
}

impl DataIntegrityWarning {
    pub fn new(kind: WarningKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        let warning = Self {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        };
        log::warn!(
            "Dropping {} ({:?}): {}",
            warning.subject,
            warning.kind,
            warning.detail
        );
        warning
    }
}
