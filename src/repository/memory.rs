//! In-memory store
//!
//! Backs tests and offline runs. Writes are applied one at a time, so a
//! failing update in a batch leaves the earlier ones in place, the same way
//! the hosted store behaves.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult, Term, TermCard, Translation};
use crate::ranking::{sort_translations, NewRankedItem, PositionUpdate};
use super::traits::{PersistenceService, Repository, TermCatalog};

pub struct MemoryStore {
    terms: Mutex<Vec<Term>>,
    translations: Mutex<Vec<Translation>>,
    failing: Mutex<HashSet<i64>>,
    fail_fetches: AtomicBool,
    write_calls: AtomicU64,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            terms: Mutex::new(Vec::new()),
            translations: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            fail_fetches: AtomicBool::new(false),
            write_calls: AtomicU64::new(0),
            next_id: AtomicI64::new(1),
        }
    }
}

impl MemoryStore {
    pub fn with_rows(rows: Vec<Translation>) -> Self {
        let next = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let store = Self::default();
        store.next_id.store(next, Ordering::Relaxed);
        Self {
            translations: Mutex::new(rows),
            ..store
        }
    }

    pub fn with_terms(terms: Vec<Term>, rows: Vec<Translation>) -> Self {
        let next = terms
            .iter()
            .map(|t| t.id)
            .chain(rows.iter().map(|r| r.id))
            .max()
            .unwrap_or(0)
            + 1;
        let store = Self::default();
        store.next_id.store(next, Ordering::Relaxed);
        Self {
            terms: Mutex::new(terms),
            translations: Mutex::new(rows),
            ..store
        }
    }

    pub async fn rows(&self) -> Vec<Translation> {
        self.translations.lock().await.clone()
    }

    pub async fn terms(&self) -> Vec<Term> {
        self.terms.lock().await.clone()
    }

    /// Number of write requests issued (position batches, deletes, inserts)
    pub fn write_calls(&self) -> u64 {
        self.write_calls.load(Ordering::Relaxed)
    }

    /// Make every write touching this item id fail
    pub async fn fail_on(&self, id: i64) {
        self.failing.lock().await.insert(id);
    }

    pub async fn clear_failures(&self) {
        self.failing.lock().await.clear();
    }

    pub async fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::Relaxed);
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn check_fetch(&self) -> DomainResult<()> {
        if self.fail_fetches.load(Ordering::Relaxed) {
            return Err(DomainError::Persistence("fetch failed".to_string()));
        }
        Ok(())
    }

    async fn cards(&self, terms: Vec<Term>) -> Vec<TermCard> {
        let rows = self.translations.lock().await;
        terms
            .into_iter()
            .map(|term| {
                let mut translations: Vec<Translation> =
                    rows.iter().filter(|r| r.term_id == term.id).cloned().collect();
                sort_translations(&mut translations);
                TermCard { term, translations }
            })
            .collect()
    }

    async fn matching_terms<F>(&self, keep: F) -> Vec<Term>
    where
        F: Fn(&Term) -> bool,
    {
        let mut found: Vec<Term> = self.terms.lock().await.iter().filter(|t| keep(*t)).cloned().collect();
        found.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        found
    }
}

fn is_prefix(term: &Term, query: &str) -> bool {
    term.name.to_lowercase().starts_with(&query.to_lowercase())
}

#[async_trait]
impl PersistenceService for MemoryStore {
    async fn fetch_ranked_items(&self, parent_id: i64) -> DomainResult<Vec<Translation>> {
        self.check_fetch()?;
        let rows = self.translations.lock().await;
        Ok(rows.iter().filter(|r| r.term_id == parent_id).cloned().collect())
    }

    async fn bulk_upsert_positions(&self, updates: &[PositionUpdate]) -> Vec<DomainResult<()>> {
        self.write_calls.fetch_add(1, Ordering::Relaxed);
        let failing = self.failing.lock().await.clone();
        let mut rows = self.translations.lock().await;

        updates
            .iter()
            .map(|update| {
                if failing.contains(&update.id) {
                    return Err(DomainError::Persistence(format!("write to {} failed", update.id)));
                }
                let row = rows
                    .iter_mut()
                    .find(|r| r.id == update.id)
                    .ok_or_else(|| DomainError::NotFound(format!("Translation {} not found", update.id)))?;
                row.sort_order = Some(update.position);
                row.is_preferred = Some(update.preferred);
                Ok(())
            })
            .collect()
    }

    async fn delete_item(&self, id: i64) -> DomainResult<()> {
        self.write_calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.lock().await.contains(&id) {
            return Err(DomainError::Persistence(format!("delete of {} failed", id)));
        }
        let mut rows = self.translations.lock().await;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(DomainError::NotFound(format!("Translation {} not found", id)));
        }
        Ok(())
    }

    async fn delete_items_for_parent(&self, parent_id: i64) -> DomainResult<()> {
        self.write_calls.fetch_add(1, Ordering::Relaxed);
        self.translations.lock().await.retain(|r| r.term_id != parent_id);
        Ok(())
    }

    async fn insert_items(&self, parent_id: i64, items: &[NewRankedItem]) -> DomainResult<Vec<i64>> {
        self.write_calls.fetch_add(1, Ordering::Relaxed);
        let now = chrono::Utc::now().timestamp_millis();
        let mut rows = self.translations.lock().await;
        let ids = items
            .iter()
            .map(|item| {
                let id = self.allocate_id();
                rows.push(Translation {
                    id,
                    term_id: parent_id,
                    text: item.text.clone(),
                    is_preferred: Some(item.preferred),
                    sort_order: Some(item.position),
                    usage: item.usage.clone(),
                    created_at: Some(now),
                });
                id
            })
            .collect();
        Ok(ids)
    }
}

#[async_trait]
impl Repository<Term> for MemoryStore {
    async fn create(&self, entity: &Term) -> DomainResult<Term> {
        let mut term = entity.clone();
        term.id = self.allocate_id();
        term.created_at = Some(chrono::Utc::now().timestamp_millis());
        self.terms.lock().await.push(term.clone());
        Ok(term)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Term>> {
        self.check_fetch()?;
        Ok(self.terms.lock().await.iter().find(|t| t.id == id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<Term>> {
        self.check_fetch()?;
        let mut terms = self.terms.lock().await.clone();
        terms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(terms)
    }

    async fn update(&self, entity: &Term) -> DomainResult<Term> {
        let mut terms = self.terms.lock().await;
        let slot = terms
            .iter_mut()
            .find(|t| t.id == entity.id)
            .ok_or_else(|| DomainError::NotFound(format!("Term {} not found", entity.id)))?;
        slot.name = entity.name.clone();
        slot.aliases = entity.aliases.clone();
        slot.note = entity.note.clone();
        Ok(slot.clone())
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        let mut terms = self.terms.lock().await;
        let before = terms.len();
        terms.retain(|t| t.id != id);
        if terms.len() == before {
            return Err(DomainError::NotFound(format!("Term {} not found", id)));
        }
        drop(terms);
        self.translations.lock().await.retain(|r| r.term_id != id);
        Ok(())
    }
}

#[async_trait]
impl TermCatalog for MemoryStore {
    async fn search_cards(&self, query: &str) -> DomainResult<Vec<TermCard>> {
        self.check_fetch()?;
        let terms = self
            .matching_terms(|t| is_prefix(t, query) || t.has_alias(query))
            .await;
        Ok(self.cards(terms).await)
    }

    async fn lookup_cards(&self, name: &str) -> DomainResult<Vec<TermCard>> {
        self.check_fetch()?;
        let terms = self
            .matching_terms(|t| t.name_matches(name) || t.has_alias(name))
            .await;
        Ok(self.cards(terms).await)
    }
}
