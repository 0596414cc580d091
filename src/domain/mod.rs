//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer has NO external dependencies (except serde for serialization).

mod entity;
mod term;
mod translation;

pub use entity::{Entity, DomainError, DomainResult};
pub use term::{Term, TermCard};
pub use translation::Translation;
