//! Commands that open ranked lists
//!
//! A term card, term page or edit page each get their own synchronizer or
//! form; the UI drives it from there.

use crate::domain::TermCard;
use crate::form::TermForm;
use crate::ranking::RankedListSynchronizer;
use crate::AppState;

/// Load a term's translations into a synchronizer
pub async fn open_translations(state: &AppState, term_id: i64) -> Result<RankedListSynchronizer, String> {
    let mut sync = RankedListSynchronizer::new(
        term_id,
        state.translations.clone(),
        state.session.clone(),
        state.notifier.clone(),
    );
    sync.load().await.map_err(|e| e.to_string())?;
    Ok(sync)
}

/// Synchronizer over translations that arrived embedded in a search result
pub fn open_card(state: &AppState, card: &TermCard) -> RankedListSynchronizer {
    RankedListSynchronizer::with_rows(
        card.term.id,
        card.translations.clone(),
        state.translations.clone(),
        state.session.clone(),
        state.notifier.clone(),
    )
}

/// Edit form for a stored term
pub async fn edit_form(state: &AppState, term_id: i64) -> Result<TermForm, String> {
    let card = super::get_term(state, term_id)
        .await?
        .ok_or_else(|| format!("Term {} not found", term_id))?;
    Ok(TermForm::from_card(&card))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Term, Translation};
    use crate::notify::NotificationLog;
    use crate::ranking::{ItemId, SyncOutcome};
    use crate::repository::MemoryStore;
    use crate::session::{AuthSession, Session};
    use std::sync::Arc;

    fn state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_terms(
            vec![Term::new(4, "context".to_string())],
            vec![
                Translation::new(5, 4, "맥락".to_string()).ranked(0, true),
                Translation::new(6, 4, "문맥".to_string()).ranked(1, false),
            ],
        ));
        let session = Session::signed_in(AuthSession::new("editor", "token"));
        let state = AppState::with_store(
            store.clone(),
            Default::default(),
            session,
            Arc::new(NotificationLog::default()),
        );
        (state, store)
    }

    #[tokio::test]
    async fn test_open_and_promote() {
        let (state, store) = state();
        let mut sync = open_translations(&state, 4).await.unwrap();
        assert_eq!(sync.promote(ItemId::Stored(6)).await, SyncOutcome::Applied);

        let rows = store.rows().await;
        assert_eq!(rows.iter().find(|r| r.id == 6).unwrap().is_preferred, Some(true));
    }

    #[tokio::test]
    async fn test_open_card_is_ready_without_fetch() {
        let (state, store) = state();
        store.fail_fetches(true).await;
        let card = TermCard {
            term: Term::new(4, "context".to_string()),
            translations: store.rows().await,
        };
        let sync = open_card(&state, &card);
        assert_eq!(sync.items().len(), 2);
        assert_eq!(sync.preferred().unwrap().text, "맥락");
    }

    #[tokio::test]
    async fn test_edit_form() {
        let (state, _) = state();
        let form = edit_form(&state, 4).await.unwrap();
        assert_eq!(form.term_id(), Some(4));
        assert_eq!(form.translations.len(), 2);
        assert!(edit_form(&state, 99).await.is_err());
    }
}
