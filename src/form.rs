//! Term form
//!
//! Editable state behind the create and edit pages. Nothing here talks to a
//! store; `validate` turns the form into the payloads the save command writes.

use crate::domain::{DomainError, DomainResult, Term, TermCard};
use crate::ranking::{from_translations, DraftList, NewRankedItem, RemovalPolicy};

#[derive(Debug, Clone, PartialEq)]
pub struct TermForm {
    term_id: Option<i64>,
    pub name: String,
    pub aliases: DraftList,
    pub translations: DraftList,
    /// Markdown source, stored as-is
    pub note: String,
}

/// A form that passed validation, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTerm {
    pub term: Term,
    pub translations: Vec<NewRankedItem>,
}

impl TermForm {
    /// Blank create form, optionally prefilled from a search query
    pub fn new(prefill: &str) -> Self {
        Self {
            term_id: None,
            name: prefill.trim().to_string(),
            aliases: DraftList::new(RemovalPolicy::AllowEmpty),
            translations: DraftList::new(RemovalPolicy::KeepOne),
            note: String::new(),
        }
    }

    /// Edit form for an existing term
    pub fn from_card(card: &TermCard) -> Self {
        let ranked = from_translations(card.translations.clone());
        Self {
            term_id: Some(card.term.id),
            name: card.term.name.clone(),
            aliases: DraftList::from_texts(card.term.aliases.iter().cloned(), RemovalPolicy::AllowEmpty),
            translations: DraftList::from_items(ranked, RemovalPolicy::KeepOne),
            note: card.term.note.clone().unwrap_or_default(),
        }
    }

    pub fn term_id(&self) -> Option<i64> {
        self.term_id
    }

    pub fn is_edit(&self) -> bool {
        self.term_id.is_some()
    }

    pub fn validate(&self) -> DomainResult<ValidatedTerm> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidInput("Term name is required".to_string()));
        }
        if self.translations.is_empty() {
            return Err(DomainError::InvalidInput(
                "At least one translation is required".to_string(),
            ));
        }
        if self.translations.items().iter().any(|t| t.text.trim().is_empty()) {
            return Err(DomainError::InvalidInput(
                "Translation text cannot be empty".to_string(),
            ));
        }

        let aliases = self
            .aliases
            .texts()
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        let note = Some(self.note.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(ValidatedTerm {
            term: Term {
                id: self.term_id.unwrap_or(0),
                name: name.to_string(),
                aliases,
                note,
                created_at: None,
            },
            translations: self.translations.finalize(),
        })
    }
}
