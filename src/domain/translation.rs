//! Translation Entity
//!
//! One Korean rendering of a term. `sort_order` and `is_preferred` are
//! nullable because rows created before ranking existed carry neither.

use serde::{Deserialize, Serialize};
use super::entity::Entity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: i64,
    pub term_id: i64,
    pub text: String,
    pub is_preferred: Option<bool>,
    pub sort_order: Option<i32>,
    /// Usage example or explanation
    pub usage: Option<String>,
    pub created_at: Option<i64>,
}

impl Translation {
    pub fn new(id: i64, term_id: i64, text: String) -> Self {
        Self {
            id,
            term_id,
            text,
            is_preferred: None,
            sort_order: None,
            usage: None,
            created_at: None,
        }
    }

    pub fn ranked(mut self, sort_order: i32, is_preferred: bool) -> Self {
        self.sort_order = Some(sort_order);
        self.is_preferred = Some(is_preferred);
        self
    }

    pub fn preferred(&self) -> bool {
        self.is_preferred.unwrap_or(false)
    }
}

impl Entity for Translation {
    type Id = i64;

    fn id(&self) -> Self::Id {
        self.id
    }
}
