//! Ranked List Synchronizer
//!
//! Keeps one parent's ranked list in sync with the persistence service.
//! Mutations are applied locally first and the resulting ranks are written
//! as one batch; if any write in the batch fails the local list is restored
//! from the pre-mutation snapshot and a failure notification is emitted.
//!
//! The batch is only as atomic as the backing store. The SQLite store runs
//! it in one transaction; the hosted store issues independent writes, so a
//! failure can leave remote ranks partially updated even after the local
//! rollback. `needs_repair` / `repair` exist to converge in that case.

use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::watch;

use crate::domain::{DomainResult, Translation};
use crate::notify::{Notification, Notifier};
use crate::repository::PersistenceService;
use crate::session::Session;
use super::item::{ItemId, PositionUpdate, RankedItem};
use super::mutation::{self, Mutation};

/// Lifecycle of one list instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Loading,
    Ready,
    /// A batch is in flight
    Mutating,
    /// Last batch failed and the list was restored; renders like `Ready`
    RolledBack,
}

/// Result of a user operation. Failures are reported through the notifier,
/// never as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    /// No-op: unknown id, drop on self, or already preferred
    Unchanged,
    /// No write permission; nothing was touched
    Denied,
    /// Another batch is still in flight
    Busy,
    RolledBack,
}

/// An optimistic mutation waiting for its batch to settle
#[derive(Debug)]
pub struct PendingSync {
    generation: u64,
    mutation: Mutation,
    snapshot: Vec<RankedItem>,
    updates: Vec<PositionUpdate>,
}

impl PendingSync {
    pub fn updates(&self) -> &[PositionUpdate] {
        &self.updates
    }
}

pub struct RankedListSynchronizer {
    parent_id: i64,
    items: Vec<RankedItem>,
    state: SyncState,
    generation: u64,
    needs_repair: bool,
    store: Arc<dyn PersistenceService>,
    session: Session,
    notifier: Arc<dyn Notifier>,
    view: watch::Sender<Vec<RankedItem>>,
}

impl RankedListSynchronizer {
    pub fn new(
        parent_id: i64,
        store: Arc<dyn PersistenceService>,
        session: Session,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (view, _) = watch::channel(Vec::new());
        Self {
            parent_id,
            items: Vec::new(),
            state: SyncState::Loading,
            generation: 0,
            needs_repair: false,
            store,
            session,
            notifier,
            view,
        }
    }

    /// Build a ready list from rows the caller already fetched
    /// (e.g. translations embedded in a search result)
    pub fn with_rows(
        parent_id: i64,
        rows: Vec<Translation>,
        store: Arc<dyn PersistenceService>,
        session: Session,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut sync = Self::new(parent_id, store, session, notifier);
        sync.install(rows);
        sync
    }

    fn install(&mut self, rows: Vec<Translation>) {
        self.needs_repair = mutation::needs_repair(&rows);
        self.items = mutation::from_translations(rows);
        self.state = SyncState::Ready;
        self.publish();
    }

    /// Fetch the list from the store, replacing local state
    pub async fn load(&mut self) -> DomainResult<()> {
        let previous = self.state;
        self.state = SyncState::Loading;
        match self.store.fetch_ranked_items(self.parent_id).await {
            Ok(rows) => {
                debug!("Loaded {} ranked items for parent {}", rows.len(), self.parent_id);
                self.install(rows);
                Ok(())
            }
            Err(e) => {
                error!("Failed to load ranked items for parent {}: {}", self.parent_id, e);
                // A failed reload keeps the list that is already shown usable
                self.state = previous;
                self.notifier
                    .notify(Notification::error("Could not load translations."));
                Err(e)
            }
        }
    }

    pub fn parent_id(&self) -> i64 {
        self.parent_id
    }

    pub fn items(&self) -> &[RankedItem] {
        &self.items
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn needs_repair(&self) -> bool {
        self.needs_repair
    }

    pub fn preferred(&self) -> Option<&RankedItem> {
        self.items.iter().find(|item| item.is_preferred)
    }

    /// Watch the rendered list; every optimistic change and rollback is published
    pub fn subscribe(&self) -> watch::Receiver<Vec<RankedItem>> {
        self.view.subscribe()
    }

    fn publish(&self) {
        self.view.send_replace(self.items.clone());
    }

    /// Apply `mutation` locally and return the batch to write.
    ///
    /// Rejected before any local change when the session cannot write, when a
    /// batch is already in flight, or when the mutation is a no-op.
    pub fn begin(&mut self, mutation: Mutation) -> Result<PendingSync, SyncOutcome> {
        if !self.session.can_write() {
            debug!("Ignoring {:?} on parent {}: no write access", mutation, self.parent_id);
            return Err(SyncOutcome::Denied);
        }
        if self.state == SyncState::Mutating || self.state == SyncState::Loading {
            debug!("Ignoring {:?} on parent {}: list is {:?}", mutation, self.parent_id, self.state);
            return Err(SyncOutcome::Busy);
        }
        let next = mutation::apply_mutation(&self.items, &mutation).ok_or(SyncOutcome::Unchanged)?;

        let updates = mutation::position_updates(&next);
        let snapshot = std::mem::replace(&mut self.items, next);
        self.generation += 1;
        self.state = SyncState::Mutating;
        self.publish();
        debug!(
            "Applied {:?} on parent {} optimistically, {} writes pending",
            mutation,
            self.parent_id,
            updates.len()
        );

        Ok(PendingSync {
            generation: self.generation,
            mutation,
            snapshot,
            updates,
        })
    }

    /// Finish a batch started by `begin` with its per-item results
    pub fn settle(&mut self, pending: PendingSync, results: Vec<DomainResult<()>>) -> SyncOutcome {
        if pending.generation != self.generation || self.state != SyncState::Mutating {
            warn!("Discarding stale batch result for parent {}", self.parent_id);
            return SyncOutcome::Unchanged;
        }

        let failures: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err().map(|e| e.to_string()))
            .collect();
        let complete = results.len() == pending.updates.len();

        if failures.is_empty() && complete {
            self.state = SyncState::Ready;
            self.needs_repair = false;
            if let Mutation::Promote(_) = pending.mutation {
                self.notifier
                    .notify(Notification::success("Preferred translation updated."));
            }
            return SyncOutcome::Applied;
        }

        warn!(
            "Rolling back {:?} on parent {}: {} failed, {} of {} results received ({})",
            pending.mutation,
            self.parent_id,
            failures.len(),
            results.len(),
            pending.updates.len(),
            failures.join("; ")
        );
        self.items = pending.snapshot;
        self.state = SyncState::RolledBack;
        // Remote ranks may now differ from what is shown
        self.needs_repair = true;
        self.publish();
        let message = match pending.mutation {
            Mutation::Promote(_) => "Could not save the change.",
            Mutation::Move { .. } => "Could not save the new order.",
        };
        self.notifier.notify(Notification::error(message));
        SyncOutcome::RolledBack
    }

    async fn run(&mut self, mutation: Mutation) -> SyncOutcome {
        let pending = match self.begin(mutation) {
            Ok(pending) => pending,
            Err(outcome) => return outcome,
        };
        let results = self.store.bulk_upsert_positions(&pending.updates).await;
        self.settle(pending, results)
    }

    /// Drag `item` and drop it onto `onto`
    pub async fn reorder(&mut self, item: ItemId, onto: ItemId) -> SyncOutcome {
        self.run(Mutation::Move { item, onto }).await
    }

    /// Make `item` the preferred entry
    pub async fn promote(&mut self, item: ItemId) -> SyncOutcome {
        self.run(Mutation::Promote(item)).await
    }

    /// Delete a stored entry. The last entry of a list cannot be deleted here;
    /// a term keeps at least one translation.
    pub async fn delete(&mut self, item: ItemId) -> SyncOutcome {
        if !self.session.can_write() {
            return SyncOutcome::Denied;
        }
        if self.state == SyncState::Mutating || self.state == SyncState::Loading {
            return SyncOutcome::Busy;
        }
        let (index, id) = match (mutation::index_of(&self.items, item), item.stored()) {
            (Some(index), Some(id)) => (index, id),
            _ => return SyncOutcome::Unchanged,
        };
        if self.items.len() == 1 {
            self.notifier
                .notify(Notification::error("A term needs at least one translation."));
            return SyncOutcome::Unchanged;
        }

        let snapshot = self.items.clone();
        self.items.remove(index);
        mutation::reindex(&mut self.items);
        self.state = SyncState::Mutating;
        self.publish();

        match self.store.delete_item(id).await {
            Ok(()) => {
                // Close the gap left behind so the stored ranks match the list
                let updates = mutation::position_updates(&self.items);
                let results = self.store.bulk_upsert_positions(&updates).await;
                self.state = SyncState::Ready;
                if results.len() == updates.len() && results.iter().all(|r| r.is_ok()) {
                    self.needs_repair = false;
                } else {
                    warn!("Re-ranking parent {} after deleting {} failed", self.parent_id, id);
                    self.needs_repair = true;
                    self.notifier
                        .notify(Notification::error("Could not save the new order."));
                }
                SyncOutcome::Applied
            }
            Err(e) => {
                warn!("Rolling back delete of {} on parent {}: {}", id, self.parent_id, e);
                self.items = snapshot;
                self.state = SyncState::RolledBack;
                self.publish();
                self.notifier
                    .notify(Notification::error("Could not delete the translation."));
                SyncOutcome::RolledBack
            }
        }
    }

    /// Write the displayed ranks back when the stored ones disagree
    pub async fn repair(&mut self) -> SyncOutcome {
        if !self.needs_repair {
            return SyncOutcome::Unchanged;
        }
        if !self.session.can_write() {
            return SyncOutcome::Denied;
        }
        if self.state == SyncState::Mutating || self.state == SyncState::Loading {
            return SyncOutcome::Busy;
        }
        let updates = mutation::position_updates(&self.items);
        self.state = SyncState::Mutating;
        let results = self.store.bulk_upsert_positions(&updates).await;
        if results.len() == updates.len() && results.iter().all(|r| r.is_ok()) {
            self.state = SyncState::Ready;
            self.needs_repair = false;
            SyncOutcome::Applied
        } else {
            error!("Repairing ranks for parent {} failed", self.parent_id);
            self.state = SyncState::RolledBack;
            self.notifier
                .notify(Notification::error("Could not save the new order."));
            SyncOutcome::RolledBack
        }
    }
}
