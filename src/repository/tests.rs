//! Repository Integration Tests
//!
//! Tests for the SQLite repositories with an in-memory database.

#[cfg(test)]
mod tests {
    use crate::domain::{DomainError, Term};
    use crate::ranking::{NewRankedItem, PositionUpdate};
    use crate::repository::{
        init_db, DbState, PersistenceService, Repository, TermCatalog,
        TermRepository, TranslationRepository,
    };
    use std::path::PathBuf;

    async fn setup_test_db() -> (DbState, TermRepository, TranslationRepository) {
        let db_path = PathBuf::from(":memory:");
        let db_state = init_db(&db_path).await.expect("Failed to init test DB");
        let terms = TermRepository::new(db_state.conn.clone());
        let translations = TranslationRepository::new(db_state.conn.clone());
        (db_state, terms, translations)
    }

    fn new_items(texts: &[&str]) -> Vec<NewRankedItem> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| NewRankedItem {
                text: text.to_string(),
                usage: None,
                position: i as i32,
                preferred: i == 0,
            })
            .collect()
    }

    async fn search_names(terms: &TermRepository, query: &str) -> Vec<String> {
        terms
            .search_cards(query)
            .await
            .unwrap()
            .into_iter()
            .map(|card| card.term.name)
            .collect()
    }

    async fn seed(terms: &TermRepository, name: &str, aliases: &[&str]) -> Term {
        let term = Term::new(0, name.to_string())
            .with_aliases(aliases.iter().map(|a| a.to_string()).collect());
        terms.create(&term).await.expect("Failed to create")
    }

    #[tokio::test]
    async fn test_create_term() {
        let (_db, terms, _) = setup_test_db().await;

        let created = seed(&terms, "context", &["ctx"]).await;
        assert!(created.id > 0);
        assert!(created.created_at.is_some());

        let found = terms.find_by_id(created.id).await.expect("Find failed").unwrap();
        assert_eq!(found.name, "context");
        assert_eq!(found.aliases, vec!["ctx"]);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (_db, terms, _) = setup_test_db().await;
        seed(&terms, "first", &[]).await;
        seed(&terms, "second", &[]).await;

        let names: Vec<String> = terms.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_update_term() {
        let (_db, terms, _) = setup_test_db().await;
        let mut created = seed(&terms, "contxt", &[]).await;

        created.name = "context".to_string();
        created.note = Some("Often left untranslated.".to_string());
        terms.update(&created).await.expect("Update failed");

        let found = terms.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "context");
        assert_eq!(found.note.as_deref(), Some("Often left untranslated."));
    }

    #[tokio::test]
    async fn test_update_missing_term() {
        let (_db, terms, _) = setup_test_db().await;
        let ghost = Term::new(999, "ghost".to_string());
        assert!(matches!(terms.update(&ghost).await, Err(DomainError::NotFound(_))));
        assert!(matches!(terms.delete(999).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_term_cascades() {
        let (_db, terms, translations) = setup_test_db().await;
        let term = seed(&terms, "context", &[]).await;
        translations.insert_items(term.id, &new_items(&["맥락", "문맥"])).await.unwrap();

        terms.delete(term.id).await.expect("Delete failed");
        assert!(terms.find_by_id(term.id).await.unwrap().is_none());
        assert!(translations.fetch_ranked_items(term.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_prefix_and_alias() {
        let (_db, terms, _) = setup_test_db().await;
        seed(&terms, "Context", &[]).await;
        seed(&terms, "container", &[]).await;
        seed(&terms, "pipeline", &["CI"]).await;
        seed(&terms, "recontextualize", &[]).await;

        assert_eq!(search_names(&terms, "con").await, vec!["container", "Context"]);
        assert_eq!(search_names(&terms, "CI").await, vec!["pipeline"]);

        // Aliases match exactly, not by prefix
        assert!(search_names(&terms, "C").await.iter().all(|name| name != "pipeline"));
    }

    #[tokio::test]
    async fn test_search_wildcards_are_literal() {
        let (_db, terms, _) = setup_test_db().await;
        seed(&terms, "100% coverage", &[]).await;
        seed(&terms, "1000 users", &[]).await;

        assert_eq!(search_names(&terms, "100%").await, vec!["100% coverage"]);
        assert!(search_names(&terms, "1_0").await.is_empty());
    }

    #[tokio::test]
    async fn test_cards_carry_sorted_translations() {
        let (_db, terms, translations) = setup_test_db().await;
        let term = seed(&terms, "context", &["ctx"]).await;
        let ids = translations
            .insert_items(term.id, &new_items(&["맥락", "문맥", "컨텍스트"]))
            .await
            .unwrap();
        translations
            .bulk_upsert_positions(&[
                PositionUpdate { id: ids[2], position: 0, preferred: true },
                PositionUpdate { id: ids[0], position: 1, preferred: false },
                PositionUpdate { id: ids[1], position: 2, preferred: false },
            ])
            .await;

        let cards = terms.search_cards("ctx").await.unwrap();
        assert_eq!(cards.len(), 1);
        let texts: Vec<&str> = cards[0].translations.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["컨텍스트", "맥락", "문맥"]);
        assert_eq!(cards[0].preferred().unwrap().text, "컨텍스트");
    }

    #[tokio::test]
    async fn test_lookup_exact_name_or_alias() {
        let (_db, terms, _) = setup_test_db().await;
        seed(&terms, "Context", &[]).await;
        seed(&terms, "context window", &[]).await;
        seed(&terms, "pipeline", &["CI"]).await;

        let cards = terms.lookup_cards("context").await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].term.name, "Context");

        let cards = terms.lookup_cards("CI").await.unwrap();
        assert_eq!(cards[0].term.name, "pipeline");
        assert!(terms.lookup_cards("ci").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_upsert_is_transactional() {
        let (_db, terms, translations) = setup_test_db().await;
        let term = seed(&terms, "context", &[]).await;
        let ids = translations.insert_items(term.id, &new_items(&["a", "b"])).await.unwrap();

        let results = translations
            .bulk_upsert_positions(&[
                PositionUpdate { id: ids[1], position: 0, preferred: true },
                PositionUpdate { id: 4242, position: 1, preferred: false },
            ])
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_err()));
        assert!(matches!(results[1], Err(DomainError::NotFound(_))));

        // The first write was rolled back with the rest
        let rows = translations.fetch_ranked_items(term.id).await.unwrap();
        let b = rows.iter().find(|r| r.id == ids[1]).unwrap();
        assert_eq!(b.sort_order, Some(1));
        assert_eq!(b.is_preferred, Some(false));
    }

    #[tokio::test]
    async fn test_replace_translations() {
        let (_db, terms, translations) = setup_test_db().await;
        let term = seed(&terms, "context", &[]).await;
        translations.insert_items(term.id, &new_items(&["old"])).await.unwrap();

        translations.delete_items_for_parent(term.id).await.unwrap();
        translations.insert_items(term.id, &new_items(&["new", "newer"])).await.unwrap();

        let rows = translations.fetch_ranked_items(term.id).await.unwrap();
        let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["new", "newer"]);
        assert_eq!(rows[0].is_preferred, Some(true));
        assert_eq!(rows[1].sort_order, Some(1));
    }

    #[tokio::test]
    async fn test_insert_requires_parent() {
        let (_db, _, translations) = setup_test_db().await;
        let result = translations.insert_items(77, &new_items(&["orphan"])).await;
        assert!(matches!(result, Err(DomainError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_delete_translation() {
        let (_db, terms, translations) = setup_test_db().await;
        let term = seed(&terms, "context", &[]).await;
        let ids = translations.insert_items(term.id, &new_items(&["a", "b"])).await.unwrap();

        translations.delete_item(ids[0]).await.unwrap();
        assert_eq!(translations.fetch_ranked_items(term.id).await.unwrap().len(), 1);
        assert!(matches!(translations.delete_item(ids[0]).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_closed_database_reports_not_initialized() {
        let (db, terms, _) = setup_test_db().await;
        db.close().await;
        assert_eq!(
            terms.list().await.unwrap_err(),
            DomainError::Internal("Database not initialized".to_string())
        );
    }
}
