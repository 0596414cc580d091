//! Ranked Item Types
//!
//! The in-memory shape of one rankable entry (a translation or an alias)
//! and the write payloads derived from it.

use serde::{Deserialize, Serialize};

/// Identifier of a ranked item within its owning list
///
/// `Stored` ids come from the persistence service. `Draft` ids are handed
/// out locally for entries that have not been saved yet and are only unique
/// within one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemId {
    Stored(i64),
    Draft(u64),
}

impl ItemId {
    pub fn stored(&self) -> Option<i64> {
        match self {
            ItemId::Stored(id) => Some(*id),
            ItemId::Draft(_) => None,
        }
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Stored(id) => write!(f, "{}", id),
            ItemId::Draft(id) => write!(f, "draft-{}", id),
        }
    }
}

/// One entry of a ranked list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: ItemId,
    pub text: String,
    pub usage: Option<String>,
    /// Zero-based rank; `None` while the entry only exists in a draft
    pub position: Option<u32>,
    /// True iff `position == Some(0)`
    pub is_preferred: bool,
}

impl RankedItem {
    /// Unsaved entry with no rank yet
    pub fn draft(id: u64, text: String) -> Self {
        Self {
            id: ItemId::Draft(id),
            text,
            usage: None,
            position: None,
            is_preferred: false,
        }
    }

    pub fn stored(id: i64, text: String, position: u32) -> Self {
        Self {
            id: ItemId::Stored(id),
            text,
            usage: None,
            position: Some(position),
            is_preferred: position == 0,
        }
    }
}

/// Persisted rank of one stored item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: i64,
    pub position: i32,
    pub preferred: bool,
}

/// Insert payload produced when a draft list is saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRankedItem {
    pub text: String,
    pub usage: Option<String>,
    pub position: i32,
    pub preferred: bool,
}
