//! Domain Layer - Core Entity Trait
//!
//! Basic contract for all persisted glossary entities, plus the shared
//! error type used across repository, ranking and command layers.

use serde::{Deserialize, Serialize};

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainError {
    NotFound(String),
    /// Empty or malformed user input, reported before any remote call
    InvalidInput(String),
    /// Mutation attempted without write access
    PermissionDenied(String),
    /// A remote read or write failed
    Persistence(String),
    Conflict(String),
    Internal(String),
}

impl DomainError {
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::InvalidInput(_))
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            DomainError::Persistence(msg) => write!(f, "Persistence failure: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
