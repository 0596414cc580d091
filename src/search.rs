//! Term search
//!
//! Debounced search over a `TermCatalog`. Each submitted query takes a new
//! generation number; a response is only delivered if no newer query was
//! submitted while it was waiting or in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::domain::{DomainError, DomainResult, TermCard};
use crate::repository::TermCatalog;
use crate::session::Session;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Left as-is in a term slug, like a browser's `encodeURIComponent`
const SLUG_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(Vec<TermCard>),
    /// Blank query: the list shown before any search
    Initial(Vec<TermCard>),
    /// A newer query replaced this one
    Superseded,
    Failed(DomainError),
}

pub struct SearchController {
    catalog: Arc<dyn TermCatalog>,
    debounce: Duration,
    generation: AtomicU64,
    initial: Vec<TermCard>,
}

impl SearchController {
    pub fn new(catalog: Arc<dyn TermCatalog>, debounce: Duration) -> Self {
        Self {
            catalog,
            debounce,
            generation: AtomicU64::new(0),
            initial: Vec::new(),
        }
    }

    pub fn with_initial(mut self, initial: Vec<TermCard>) -> Self {
        self.initial = initial;
        self
    }

    pub fn set_initial(&mut self, initial: Vec<TermCard>) {
        self.initial = initial;
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Run one keystroke's worth of search
    pub async fn submit(&self, query: &str) -> SearchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome::Initial(self.initial.clone());
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(generation) {
            debug!("Search '{}' superseded before fetch", query);
            return SearchOutcome::Superseded;
        }

        let result = self.catalog.search_cards(query).await;
        if !self.is_current(generation) {
            debug!("Discarding stale results for '{}'", query);
            return SearchOutcome::Superseded;
        }

        match result {
            Ok(cards) => SearchOutcome::Results(cards),
            Err(e) => {
                warn!("Search for '{}' failed: {}", query, e);
                SearchOutcome::Failed(e)
            }
        }
    }

    /// Exact lookup for a term page; `slug` may still be percent-encoded
    pub async fn lookup(&self, slug: &str) -> DomainResult<Vec<TermCard>> {
        let name = decode_slug(slug);
        if name.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.catalog.lookup_cards(name.trim()).await
    }
}

/// Path segment for a term page
pub fn encode_slug(name: &str) -> String {
    utf8_percent_encode(name, SLUG_SAFE).to_string()
}

/// Percent-decode a URL path segment, keeping invalid UTF-8 lossy
pub fn decode_slug(slug: &str) -> String {
    percent_decode_str(slug).decode_utf8_lossy().into_owned()
}

/// The result whose name equals the query, ignoring case and surrounding space
pub fn exact_match<'a>(cards: &'a [TermCard], query: &str) -> Option<&'a TermCard> {
    cards.iter().find(|card| card.term.name_matches(query))
}

/// Whether to offer registering the query as a new term
pub fn should_offer_create(cards: &[TermCard], query: &str, session: &Session) -> bool {
    !query.trim().is_empty() && session.can_write() && exact_match(cards, query).is_none()
}
