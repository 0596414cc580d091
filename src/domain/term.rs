//! Term Entity
//!
//! The canonical English-side glossary entry. Translations hang off a term
//! and are ranked separately (see `ranking`).

use serde::{Deserialize, Serialize};
use super::entity::Entity;
use super::translation::Translation;

/// A glossary term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Unique identifier (0 until persisted)
    pub id: i64,
    /// English name, unique by convention but not enforced
    pub name: String,
    /// Alternative spellings and plural forms, in display order
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Free-text markdown note
    pub note: Option<String>,
    /// Creation time, unix millis
    pub created_at: Option<i64>,
}

impl Term {
    pub fn new(id: i64, name: String) -> Self {
        Self {
            id,
            name,
            aliases: Vec::new(),
            note: None,
            created_at: None,
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Case-insensitive name comparison used for exact-match lookups
    pub fn name_matches(&self, query: &str) -> bool {
        self.name.to_lowercase() == query.trim().to_lowercase()
    }

    /// Exact alias containment
    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a == alias)
    }
}

impl Entity for Term {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A term together with its ranked translations, as shown in search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermCard {
    pub term: Term,
    pub translations: Vec<Translation>,
}

impl TermCard {
    /// The translation rendered as preferred (rank 0)
    pub fn preferred(&self) -> Option<&Translation> {
        self.translations.first()
    }
}

impl Entity for TermCard {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.term.id
    }
}
