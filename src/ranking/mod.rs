//! Ranking
//!
//! Ordered lists of translations and aliases: pure reorder/promote logic,
//! unsaved draft lists, and the synchronizer that persists ranks with
//! optimistic update and rollback.

mod item;
mod mutation;
mod draft;
mod synchronizer;

pub use item::{ItemId, NewRankedItem, PositionUpdate, RankedItem};
pub use mutation::{
    apply_mutation, from_translations, needs_repair, position_updates, sort_translations,
    split_entries, Mutation,
};
pub use draft::{DraftList, RemovalPolicy};
pub use synchronizer::{PendingSync, RankedListSynchronizer, SyncOutcome, SyncState};
