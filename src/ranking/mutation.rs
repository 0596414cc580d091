//! Pure List Operations
//!
//! Everything here is side-effect free: a mutation takes the current list
//! and returns the next one, so callers can keep the previous value as a
//! rollback snapshot.

use crate::domain::Translation;
use super::item::{ItemId, PositionUpdate, RankedItem};

/// A user intent against a ranked list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Drag `item` and drop it onto `onto`
    Move { item: ItemId, onto: ItemId },
    /// Make `item` the preferred entry
    Promote(ItemId),
}

impl Mutation {
    pub fn item(&self) -> ItemId {
        match self {
            Mutation::Move { item, .. } => *item,
            Mutation::Promote(item) => *item,
        }
    }
}

pub fn index_of(items: &[RankedItem], id: ItemId) -> Option<usize> {
    items.iter().position(|item| item.id == id)
}

/// Resolve a mutation to `(from, to)` indices, or `None` when it is a no-op
pub fn resolve(items: &[RankedItem], mutation: &Mutation) -> Option<(usize, usize)> {
    match *mutation {
        Mutation::Move { item, onto } => {
            if item == onto {
                return None;
            }
            let from = index_of(items, item)?;
            let to = index_of(items, onto)?;
            Some((from, to))
        }
        Mutation::Promote(item) => {
            let from = index_of(items, item)?;
            if from == 0 {
                return None;
            }
            Some((from, 0))
        }
    }
}

/// Single-item move: remove at `from`, reinsert at `to`
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Positions become the index; only index 0 is preferred
pub fn reindex(items: &mut [RankedItem]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.position = Some(index as u32);
        item.is_preferred = index == 0;
    }
}

/// Apply a mutation, returning the reindexed list, or `None` for a no-op
pub fn apply_mutation(items: &[RankedItem], mutation: &Mutation) -> Option<Vec<RankedItem>> {
    let (from, to) = resolve(items, mutation)?;
    let mut next = items.to_vec();
    move_item(&mut next, from, to);
    reindex(&mut next);
    Some(next)
}

/// One write per stored item, computed from a single snapshot
pub fn position_updates(items: &[RankedItem]) -> Vec<PositionUpdate> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            item.id.stored().map(|id| PositionUpdate {
                id,
                position: index as i32,
                preferred: index == 0,
            })
        })
        .collect()
}

/// Fetch-time ordering key
///
/// Rows without a persisted order fall back to their id as the order value,
/// and ties are broken by id. Given `{id:5,order:null}, {id:1,order:2},
/// {id:3,order:0}` the keys are `5, 2, 0`, so the result is `[3, 1, 5]`.
fn order_key(row: &Translation) -> (i64, i64) {
    let order = row.sort_order.map(i64::from).unwrap_or(row.id);
    (order, row.id)
}

pub fn sort_translations(rows: &mut [Translation]) {
    rows.sort_by_key(order_key);
}

/// Sort fetched rows and derive display ranks
pub fn from_translations(mut rows: Vec<Translation>) -> Vec<RankedItem> {
    sort_translations(&mut rows);
    let mut items: Vec<RankedItem> = rows
        .into_iter()
        .map(|row| RankedItem {
            id: ItemId::Stored(row.id),
            text: row.text,
            usage: row.usage,
            position: None,
            is_preferred: false,
        })
        .collect();
    reindex(&mut items);
    items
}

/// True when sorted rows carry orders or flags that disagree with their
/// normalized rank (legacy rows, gaps after deletes, stray preferred flags)
pub fn needs_repair(rows: &[Translation]) -> bool {
    let mut sorted = rows.to_vec();
    sort_translations(&mut sorted);
    sorted.iter().enumerate().any(|(index, row)| {
        row.sort_order != Some(index as i32) || row.preferred() != (index == 0)
    })
}

/// Split comma-separated user input into trimmed, non-empty entries
pub fn split_entries(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
