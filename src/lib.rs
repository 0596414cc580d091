//! TransTerm Backend
//!
//! Glossary of canonical English to Korean terminology.
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - ranking: Ordered translation lists and their persistence
//! - repository: Data access abstractions and implementations
//! - commands: Entry points for the UI

use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod domain;
pub mod form;
pub mod notify;
pub mod ranking;
pub mod repository;
pub mod search;
pub mod session;

use config::{Backend, Config};
use domain::Term;
use notify::Notifier;
use repository::{
    init_db, DbState, PersistenceService, PostgrestStore, Repository, TermCatalog, TermRepository,
    TranslationRepository,
};
use search::SearchController;
use session::Session;

/// Application state shared across commands
pub struct AppState {
    pub terms: Arc<dyn Repository<Term>>,
    pub catalog: Arc<dyn TermCatalog>,
    pub translations: Arc<dyn PersistenceService>,
    pub search: SearchController,
    pub session: Session,
    pub notifier: Arc<dyn Notifier>,
    pub config: Config,
    /// Present for the SQLite backend
    pub db_state: Option<DbState>,
}

impl AppState {
    /// State over one store that serves every role
    pub fn with_store<S>(store: Arc<S>, config: Config, session: Session, notifier: Arc<dyn Notifier>) -> Self
    where
        S: Repository<Term> + TermCatalog + PersistenceService + 'static,
    {
        let search = SearchController::new(store.clone(), config.search_debounce);
        Self {
            terms: store.clone(),
            catalog: store.clone(),
            translations: store,
            search,
            session,
            notifier,
            config,
            db_state: None,
        }
    }
}

/// Start file logging under the configured directory
pub fn init_logging(config: &Config) -> Result<(), String> {
    rolling_logger::init_logger(config.log_dir.clone(), "TransTerm")
}

/// Open the configured backend and assemble the application state
pub async fn bootstrap(config: Config, session: Session, notifier: Arc<dyn Notifier>) -> Result<AppState, String> {
    match config.backend.clone() {
        Backend::Sqlite { path } => {
            let db_state = init_db(&path).await?;
            let terms = Arc::new(TermRepository::new(db_state.conn.clone()));
            let translations = Arc::new(TranslationRepository::new(db_state.conn.clone()));
            let _ = rolling_logger::info(&format!("Opened SQLite store at {}", path.display()));
            Ok(AppState {
                terms: terms.clone(),
                catalog: terms.clone(),
                translations,
                search: SearchController::new(terms, config.search_debounce),
                session,
                notifier,
                config,
                db_state: Some(db_state),
            })
        }
        Backend::Hosted { url, api_key } => {
            let _ = rolling_logger::info(&format!("Using hosted store at {}", url));
            let store = Arc::new(PostgrestStore::new(url, api_key, session.clone()));
            Ok(AppState::with_store(store, config, session, notifier))
        }
    }
}
