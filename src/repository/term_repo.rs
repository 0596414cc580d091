//! Term Repository
//!
//! SQLite-backed implementation for Term CRUD, search, and the card view
//! (term plus ranked translations) used by search results.
//! Aliases are stored as a JSON array in a single column.

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::domain::{DomainError, DomainResult, Term, TermCard};
use crate::ranking::sort_translations;
use super::db::SharedConnection;
use super::traits::{Repository, TermCatalog};
use super::translation_repo::load_translations;

const TERM_COLUMNS: &str = "id, name, aliases, note, created_at";

fn not_initialized() -> DomainError {
    DomainError::Internal("Database not initialized".to_string())
}

fn persistence(e: rusqlite::Error) -> DomainError {
    DomainError::Persistence(e.to_string())
}

/// SQLite implementation of Term repository
pub struct TermRepository {
    conn: SharedConnection,
}

impl TermRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

/// Escape LIKE wildcards so user input only ever matches literally
pub(super) fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_term(row: &rusqlite::Row) -> rusqlite::Result<Term> {
    let aliases: String = row.get(2)?;
    Ok(Term {
        id: row.get(0)?,
        name: row.get(1)?,
        aliases: serde_json::from_str(&aliases).unwrap_or_default(),
        note: row.get::<_, Option<String>>(3)?,
        created_at: row.get::<_, Option<i64>>(4)?,
    })
}

fn query_terms(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> DomainResult<Vec<Term>> {
    let mut stmt = conn.prepare(sql).map_err(persistence)?;
    let rows = stmt.query_map(args, row_to_term).map_err(persistence)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(persistence)
}

fn encode_aliases(aliases: &[String]) -> DomainResult<String> {
    serde_json::to_string(aliases).map_err(|e| DomainError::Internal(e.to_string()))
}

fn search_terms(conn: &Connection, query: &str) -> DomainResult<Vec<Term>> {
    let pattern = format!("{}%", escape_like(query));
    query_terms(
        conn,
        &format!(
            "SELECT {} FROM terms
             WHERE name LIKE ?1 ESCAPE '\\'
                OR EXISTS (SELECT 1 FROM json_each(terms.aliases) WHERE json_each.value = ?2)
             ORDER BY name COLLATE NOCASE, id",
            TERM_COLUMNS
        ),
        params![pattern, query],
    )
}

fn lookup_terms(conn: &Connection, name: &str) -> DomainResult<Vec<Term>> {
    query_terms(
        conn,
        &format!(
            "SELECT {} FROM terms
             WHERE name = ?1 COLLATE NOCASE
                OR EXISTS (SELECT 1 FROM json_each(terms.aliases) WHERE json_each.value = ?1)
             ORDER BY name COLLATE NOCASE, id",
            TERM_COLUMNS
        ),
        params![name],
    )
}

fn to_cards(conn: &Connection, terms: Vec<Term>) -> DomainResult<Vec<TermCard>> {
    terms
        .into_iter()
        .map(|term| {
            let mut translations = load_translations(conn, term.id)?;
            sort_translations(&mut translations);
            Ok(TermCard { term, translations })
        })
        .collect()
}

#[async_trait]
impl Repository<Term> for TermRepository {
    async fn create(&self, entity: &Term) -> DomainResult<Term> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let now = chrono::Utc::now().timestamp_millis();
        conn.execute(
            "INSERT INTO terms (name, aliases, note, created_at) VALUES (?, ?, ?, ?)",
            params![entity.name, encode_aliases(&entity.aliases)?, entity.note, now],
        )
        .map_err(persistence)?;

        let mut term = entity.clone();
        term.id = conn.last_insert_rowid();
        term.created_at = Some(now);
        Ok(term)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Term>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let terms = query_terms(
            conn,
            &format!("SELECT {} FROM terms WHERE id = ?", TERM_COLUMNS),
            params![id],
        )?;
        Ok(terms.into_iter().next())
    }

    /// Newest first, as the admin table shows them
    async fn list(&self) -> DomainResult<Vec<Term>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        query_terms(
            conn,
            &format!("SELECT {} FROM terms ORDER BY created_at DESC, id DESC", TERM_COLUMNS),
            params![],
        )
    }

    async fn update(&self, entity: &Term) -> DomainResult<Term> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn
            .execute(
                "UPDATE terms SET name = ?, aliases = ?, note = ? WHERE id = ?",
                params![entity.name, encode_aliases(&entity.aliases)?, entity.note, entity.id],
            )
            .map_err(persistence)?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Term {} not found", entity.id)));
        }
        Ok(entity.clone())
    }

    /// Translations go with the term (ON DELETE CASCADE)
    async fn delete(&self, id: i64) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn
            .execute("DELETE FROM terms WHERE id = ?", params![id])
            .map_err(persistence)?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Term {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TermCatalog for TermRepository {
    async fn search_cards(&self, query: &str) -> DomainResult<Vec<TermCard>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        let terms = search_terms(conn, query)?;
        to_cards(conn, terms)
    }

    async fn lookup_cards(&self, name: &str) -> DomainResult<Vec<TermCard>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        let terms = lookup_terms(conn, name)?;
        to_cards(conn, terms)
    }
}
