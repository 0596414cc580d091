//! Repository Layer
//!
//! Data access abstractions and implementations.

mod traits;
mod db;
mod term_repo;
mod translation_repo;
mod memory;
mod postgrest;

#[cfg(test)]
mod tests;

pub use traits::{PersistenceService, Repository, TermCatalog};
pub use db::{init_db, DbState, SharedConnection};
pub use term_repo::TermRepository;
pub use translation_repo::TranslationRepository;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
