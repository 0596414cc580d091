//! Database Connection and Setup
//!
//! Manages the SQLite connection and migrations.

use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared connection handle used by every SQLite repository
pub type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Database state wrapper
#[derive(Clone)]
pub struct DbState {
    pub conn: SharedConnection,
}

impl DbState {
    pub fn new() -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Drop the connection; repositories report "not initialized" afterwards
    pub async fn close(&self) {
        self.conn.lock().await.take();
    }
}

impl Default for DbState {
    fn default() -> Self {
        Self::new()
    }
}

/// Open (or create) the database at `db_path` and run migrations.
/// `:memory:` opens a private in-memory database.
pub async fn init_db(db_path: &Path) -> Result<DbState, String> {
    let db_path_str = db_path.to_str().ok_or("Invalid DB path")?;

    let conn = Connection::open(db_path_str).map_err(|e| format!("Failed to open db: {}", e))?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| format!("Failed to enable foreign keys: {}", e))?;

    run_migrations(&conn)?;
    log::info!("Database ready at {}", db_path_str);

    let state = DbState::new();
    *state.conn.lock().await = Some(conn);

    Ok(state)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let query = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(mut rows) = stmt.query([]) else {
        return false;
    };
    while let Ok(Some(row)) = rows.next() {
        if let Ok(name) = row.get::<_, String>(1) {
            if name == column {
                return true;
            }
        }
    }
    false
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS terms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            aliases TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL
        )",
        (),
    )
    .map_err(|e| e.to_string())?;

    // Translations predate ranking; sort_order is added below
    conn.execute(
        "CREATE TABLE IF NOT EXISTS translations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            term_id INTEGER NOT NULL REFERENCES terms(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            is_preferred INTEGER,
            usage TEXT,
            created_at INTEGER NOT NULL
        )",
        (),
    )
    .map_err(|e| e.to_string())?;

    if !column_exists(conn, "terms", "note") {
        conn.execute("ALTER TABLE terms ADD COLUMN note TEXT", ())
            .map_err(|e| format!("Failed to add note: {}", e))?;
    }

    if !column_exists(conn, "translations", "sort_order") {
        conn.execute("ALTER TABLE translations ADD COLUMN sort_order INTEGER", ())
            .map_err(|e| format!("Failed to add sort_order: {}", e))?;
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_translations_term ON translations(term_id)",
        (),
    )
    .map_err(|e| e.to_string())?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_terms_name ON terms(name COLLATE NOCASE)",
        (),
    )
    .map_err(|e| e.to_string())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_add_rank_column() {
        let state = init_db(Path::new(":memory:")).await.unwrap();
        let guard = state.conn.lock().await;
        let conn = guard.as_ref().unwrap();
        assert!(column_exists(conn, "translations", "sort_order"));
        assert!(column_exists(conn, "terms", "note"));
        assert!(!column_exists(conn, "terms", "missing"));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glossary.db");
        init_db(&path).await.unwrap().close().await;
        let state = init_db(&path).await.unwrap();
        assert!(state.is_initialized().await);
        state.close().await;
        assert!(!state.is_initialized().await);
    }

    #[tokio::test]
    async fn test_legacy_table_gets_sort_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE terms (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL,
                     aliases TEXT NOT NULL DEFAULT '[]', created_at INTEGER NOT NULL);
                 CREATE TABLE translations (id INTEGER PRIMARY KEY AUTOINCREMENT, term_id INTEGER NOT NULL,
                     text TEXT NOT NULL, is_preferred INTEGER, usage TEXT, created_at INTEGER NOT NULL);
                 INSERT INTO terms (name, created_at) VALUES ('Context', 0);
                 INSERT INTO translations (term_id, text, is_preferred, created_at) VALUES (1, '맥락', 1, 0);",
            )
            .unwrap();
        }
        let state = init_db(&path).await.unwrap();
        let guard = state.conn.lock().await;
        let conn = guard.as_ref().unwrap();
        let order: Option<i32> = conn
            .query_row("SELECT sort_order FROM translations WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(order, None);
    }
}
