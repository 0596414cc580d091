//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! Implementations exist for SQLite, the hosted REST store, and memory.

use async_trait::async_trait;
use crate::domain::{Entity, DomainResult, TermCard, Translation};
use crate::ranking::{NewRankedItem, PositionUpdate};

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: T::Id) -> DomainResult<Option<T>>;

    /// List all entities
    async fn list(&self) -> DomainResult<Vec<T>>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> DomainResult<T>;

    /// Delete entity by ID
    async fn delete(&self, id: T::Id) -> DomainResult<()>;
}

/// Storage of ranked items (translations) keyed by parent id plus item id
#[async_trait]
pub trait PersistenceService: Send + Sync {
    /// All items of a parent, in no particular order
    async fn fetch_ranked_items(&self, parent_id: i64) -> DomainResult<Vec<Translation>>;

    /// Write ranks; one result per update, in input order
    async fn bulk_upsert_positions(&self, updates: &[PositionUpdate]) -> Vec<DomainResult<()>>;

    async fn delete_item(&self, id: i64) -> DomainResult<()>;

    async fn delete_items_for_parent(&self, parent_id: i64) -> DomainResult<()>;

    /// Insert items under a parent, returning their new ids in input order
    async fn insert_items(&self, parent_id: i64, items: &[NewRankedItem]) -> DomainResult<Vec<i64>>;
}

/// Read side used by search and term pages: terms with their translations
#[async_trait]
pub trait TermCatalog: Send + Sync {
    /// Case-insensitive name prefix or exact alias, ordered by name
    async fn search_cards(&self, query: &str) -> DomainResult<Vec<TermCard>>;

    /// Case-insensitive name equality or exact alias, ordered by name
    async fn lookup_cards(&self, name: &str) -> DomainResult<Vec<TermCard>>;
}
