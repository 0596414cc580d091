//! Translation Repository
//!
//! SQLite-backed persistence service for ranked translations. Rank batches
//! run inside one transaction, so a failed batch leaves no partial writes.

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::domain::{DomainError, DomainResult, Translation};
use crate::ranking::{NewRankedItem, PositionUpdate};
use super::db::SharedConnection;
use super::traits::PersistenceService;

fn not_initialized() -> DomainError {
    DomainError::Internal("Database not initialized".to_string())
}

fn persistence(e: rusqlite::Error) -> DomainError {
    DomainError::Persistence(e.to_string())
}

/// SQLite implementation of the translation store
pub struct TranslationRepository {
    conn: SharedConnection,
}

impl TranslationRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

/// Raw rows for one term, in insertion order
pub(super) fn load_translations(conn: &Connection, term_id: i64) -> DomainResult<Vec<Translation>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, term_id, text, is_preferred, sort_order, usage, created_at
             FROM translations WHERE term_id = ? ORDER BY id",
        )
        .map_err(persistence)?;

    let rows = stmt
        .query_map(params![term_id], row_to_translation)
        .map_err(persistence)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(persistence)
}

fn row_to_translation(row: &rusqlite::Row) -> rusqlite::Result<Translation> {
    Ok(Translation {
        id: row.get(0)?,
        term_id: row.get(1)?,
        text: row.get(2)?,
        is_preferred: row.get::<_, Option<bool>>(3)?,
        sort_order: row.get::<_, Option<i32>>(4)?,
        usage: row.get::<_, Option<String>>(5)?,
        created_at: row.get::<_, Option<i64>>(6)?,
    })
}

fn write_positions(conn: &mut Connection, updates: &[PositionUpdate]) -> Vec<DomainResult<()>> {
    let tx = match conn.transaction() {
        Ok(tx) => tx,
        Err(e) => {
            let err = persistence(e);
            return updates.iter().map(|_| Err(err.clone())).collect();
        }
    };

    let mut results = Vec::with_capacity(updates.len());
    for update in updates {
        let result = tx
            .execute(
                "UPDATE translations SET sort_order = ?, is_preferred = ? WHERE id = ?",
                params![update.position, update.preferred, update.id],
            )
            .map_err(persistence)
            .and_then(|changed| {
                if changed == 0 {
                    Err(DomainError::NotFound(format!("Translation {} not found", update.id)))
                } else {
                    Ok(())
                }
            });
        results.push(result);
    }

    if results.iter().all(|r| r.is_ok()) {
        if let Err(e) = tx.commit() {
            let err = persistence(e);
            return updates.iter().map(|_| Err(err.clone())).collect();
        }
        return results;
    }

    // Dropping the transaction rolls it back; nothing in the batch landed
    drop(tx);
    log::warn!("Rank batch of {} rolled back", updates.len());
    results
        .into_iter()
        .map(|r| r.and(Err(DomainError::Persistence("Batch rolled back".to_string()))))
        .collect()
}

#[async_trait]
impl PersistenceService for TranslationRepository {
    async fn fetch_ranked_items(&self, parent_id: i64) -> DomainResult<Vec<Translation>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;
        load_translations(conn, parent_id)
    }

    async fn bulk_upsert_positions(&self, updates: &[PositionUpdate]) -> Vec<DomainResult<()>> {
        let mut guard = self.conn.lock().await;
        match guard.as_mut() {
            Some(conn) => write_positions(conn, updates),
            None => updates.iter().map(|_| Err(not_initialized())).collect(),
        }
    }

    async fn delete_item(&self, id: i64) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        let changed = conn
            .execute("DELETE FROM translations WHERE id = ?", params![id])
            .map_err(persistence)?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("Translation {} not found", id)));
        }
        Ok(())
    }

    async fn delete_items_for_parent(&self, parent_id: i64) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or_else(not_initialized)?;

        conn.execute("DELETE FROM translations WHERE term_id = ?", params![parent_id])
            .map_err(persistence)?;
        Ok(())
    }

    async fn insert_items(&self, parent_id: i64, items: &[NewRankedItem]) -> DomainResult<Vec<i64>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(not_initialized)?;

        let tx = conn.transaction().map_err(persistence)?;
        let now = chrono::Utc::now().timestamp_millis();
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            tx.execute(
                "INSERT INTO translations (term_id, text, is_preferred, sort_order, usage, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![parent_id, item.text, item.preferred, item.position, item.usage, now],
            )
            .map_err(persistence)?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit().map_err(persistence)?;
        Ok(ids)
    }
}
