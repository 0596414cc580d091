//! Commands for Term operations
//!
//! Term CRUD, search and lookup. Writes require a signed-in session.

use log::{error, info};

use crate::domain::{DomainError, Term, TermCard};
use crate::form::TermForm;
use crate::notify::Notification;
use crate::ranking::sort_translations;
use crate::search::{encode_slug, exact_match, SearchOutcome};
use crate::AppState;

fn require_write(state: &AppState) -> Result<(), String> {
    if state.session.can_write() {
        return Ok(());
    }
    let err = DomainError::PermissionDenied("Sign in to edit terms".to_string());
    state.notifier.notify(Notification::error("Sign in to edit terms."));
    Err(err.to_string())
}

/// Create or update a term from the form, replacing its translations
pub async fn save_term(state: &AppState, form: &TermForm) -> Result<Term, String> {
    require_write(state)?;
    let valid = form.validate().map_err(|e| {
        state.notifier.notify(Notification::error(e.to_string()));
        e.to_string()
    })?;

    let result = async {
        let term = match form.term_id() {
            Some(_) => {
                let term = state.terms.update(&valid.term).await?;
                state.translations.delete_items_for_parent(term.id).await?;
                term
            }
            None => state.terms.create(&valid.term).await?,
        };
        state.translations.insert_items(term.id, &valid.translations).await?;
        Ok::<_, DomainError>(term)
    }
    .await;

    match result {
        Ok(term) => {
            info!("Saved term {} with {} translations", term.id, valid.translations.len());
            state.notifier.notify(Notification::success(format!("Saved \"{}\".", term.name)));
            Ok(term)
        }
        Err(e) => {
            error!("Saving term '{}' failed: {}", valid.term.name, e);
            state.notifier.notify(Notification::error("Could not save the term."));
            Err(e.to_string())
        }
    }
}

/// Get a term with its ranked translations
pub async fn get_term(state: &AppState, id: i64) -> Result<Option<TermCard>, String> {
    let term = match state.terms.find_by_id(id).await.map_err(|e| e.to_string())? {
        Some(term) => term,
        None => return Ok(None),
    };
    let mut translations = state
        .translations
        .fetch_ranked_items(id)
        .await
        .map_err(|e| e.to_string())?;
    sort_translations(&mut translations);
    Ok(Some(TermCard { term, translations }))
}

/// All terms, newest first
pub async fn list_terms(state: &AppState) -> Result<Vec<Term>, String> {
    state.terms.list().await.map_err(|e| e.to_string())
}

/// Delete a term and its translations
pub async fn delete_term(state: &AppState, id: i64) -> Result<(), String> {
    require_write(state)?;
    match state.terms.delete(id).await {
        Ok(()) => {
            info!("Deleted term {}", id);
            state.notifier.notify(Notification::success("Term deleted."));
            Ok(())
        }
        Err(e) => {
            error!("Deleting term {} failed: {}", id, e);
            state.notifier.notify(Notification::error("Could not delete the term."));
            Err(e.to_string())
        }
    }
}

/// Debounced search; `None` when a newer query superseded this one
pub async fn search_terms(state: &AppState, query: &str) -> Result<Option<Vec<TermCard>>, String> {
    match state.search.submit(query).await {
        SearchOutcome::Results(cards) | SearchOutcome::Initial(cards) => Ok(Some(cards)),
        SearchOutcome::Superseded => Ok(None),
        SearchOutcome::Failed(e) => {
            state.notifier.notify(Notification::error("Search failed."));
            Err(e.to_string())
        }
    }
}

/// Enter in the search box: slug of the listed term named exactly `query`.
/// Without one, the user is told to pick from the list instead.
pub fn open_exact_match(state: &AppState, query: &str, results: &[TermCard]) -> Result<Option<String>, String> {
    if query.trim().is_empty() {
        return Ok(None);
    }
    match exact_match(results, query) {
        Some(card) => Ok(Some(encode_slug(&card.term.name))),
        None => {
            state.notifier.notify(Notification::info(
                "Pick a term from the list or type its exact name.",
            ));
            Ok(None)
        }
    }
}

/// Terms whose name or alias equals the (possibly percent-encoded) slug
pub async fn lookup_term(state: &AppState, slug: &str) -> Result<Vec<TermCard>, String> {
    state.search.lookup(slug).await.map_err(|e| e.to_string())
}
