//! Draft Lists
//!
//! The unsaved list behind the term form: aliases and translations are
//! appended, reordered and removed locally, and ranks are only assigned when
//! the form is saved.

use crate::domain::{DomainError, DomainResult};
use super::item::{ItemId, NewRankedItem, RankedItem};
use super::mutation::{self, Mutation};

/// Whether the last entry of a list may be removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    AllowEmpty,
    /// A term must always keep at least one translation
    KeepOne,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftList {
    items: Vec<RankedItem>,
    policy: RemovalPolicy,
    next_local_id: u64,
}

impl DraftList {
    pub fn new(policy: RemovalPolicy) -> Self {
        Self {
            items: Vec::new(),
            policy,
            next_local_id: 1,
        }
    }

    /// Start from already-stored entries (edit form). Ranks are cleared;
    /// they are re-derived from list order on save.
    pub fn from_items(items: Vec<RankedItem>, policy: RemovalPolicy) -> Self {
        let items = items
            .into_iter()
            .map(|mut item| {
                item.position = None;
                item.is_preferred = false;
                item
            })
            .collect();
        Self {
            items,
            policy,
            next_local_id: 1,
        }
    }

    pub fn from_texts<I, S>(texts: I, policy: RemovalPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new(policy);
        for text in texts {
            let text: String = text.into();
            list.push(text);
        }
        list
    }

    fn push(&mut self, text: String) -> ItemId {
        let item = RankedItem::draft(self.next_local_id, text);
        self.next_local_id += 1;
        let id = item.id;
        self.items.push(item);
        id
    }

    /// Append every non-empty comma-separated entry of `raw`, in order.
    /// Returns the ids handed out to the new entries.
    pub fn append(&mut self, raw: &str) -> Vec<ItemId> {
        mutation::split_entries(raw)
            .into_iter()
            .map(|text| self.push(text))
            .collect()
    }

    pub fn remove(&mut self, id: ItemId) -> DomainResult<RankedItem> {
        let index = mutation::index_of(&self.items, id)
            .ok_or_else(|| DomainError::NotFound(format!("Entry {} not found", id)))?;
        if self.policy == RemovalPolicy::KeepOne && self.items.len() == 1 {
            return Err(DomainError::InvalidInput(
                "At least one entry is required".to_string(),
            ));
        }
        Ok(self.items.remove(index))
    }

    /// Local drag reorder; returns false for a no-op
    pub fn reorder(&mut self, item: ItemId, onto: ItemId) -> bool {
        self.apply(Mutation::Move { item, onto })
    }

    /// Move an entry to the front; returns false for a no-op
    pub fn promote(&mut self, item: ItemId) -> bool {
        self.apply(Mutation::Promote(item))
    }

    fn apply(&mut self, m: Mutation) -> bool {
        match mutation::resolve(&self.items, &m) {
            Some((from, to)) => {
                mutation::move_item(&mut self.items, from, to);
                true
            }
            None => false,
        }
    }

    pub fn set_text(&mut self, id: ItemId, text: impl Into<String>) -> DomainResult<()> {
        let item = self.get_mut(id)?;
        item.text = text.into();
        Ok(())
    }

    pub fn set_usage(&mut self, id: ItemId, usage: Option<String>) -> DomainResult<()> {
        let item = self.get_mut(id)?;
        item.usage = usage.filter(|u| !u.trim().is_empty());
        Ok(())
    }

    fn get_mut(&mut self, id: ItemId) -> DomainResult<&mut RankedItem> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("Entry {} not found", id)))
    }

    pub fn items(&self) -> &[RankedItem] {
        &self.items
    }

    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|item| item.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn policy(&self) -> RemovalPolicy {
        self.policy
    }

    /// Final ranks for saving: positions 0..N-1, preferred at 0
    pub fn finalize(&self) -> Vec<NewRankedItem> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| NewRankedItem {
                text: item.text.trim().to_string(),
                usage: item.usage.clone(),
                position: index as i32,
                preferred: index == 0,
            })
            .collect()
    }
}
