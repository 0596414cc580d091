//! Runtime configuration
//!
//! Read once from the environment at startup. Missing or unparsable values
//! log and fall back to their defaults.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use log::{info, warn};

pub const DB_PATH_KEY: &str = "TRANSTERM_DB_PATH";
pub const LOG_DIR_KEY: &str = "TRANSTERM_LOG_DIR";
pub const SUPABASE_URL_KEY: &str = "TRANSTERM_SUPABASE_URL";
pub const SUPABASE_KEY_KEY: &str = "TRANSTERM_SUPABASE_KEY";
pub const DEBOUNCE_KEY: &str = "TRANSTERM_SEARCH_DEBOUNCE_MS";

/// Where terms and translations live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite { path: PathBuf },
    Hosted { url: String, api_key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend: Backend,
    pub log_dir: PathBuf,
    pub search_debounce: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let sqlite = || Backend::Sqlite { path: path_or(var(DB_PATH_KEY), DB_PATH_KEY, "transterm.db") };
        let backend = match (var(SUPABASE_URL_KEY), var(SUPABASE_KEY_KEY)) {
            (Some(url), Some(api_key)) => Backend::Hosted { url, api_key },
            (None, None) => sqlite(),
            _ => {
                warn!("{SUPABASE_URL_KEY} and {SUPABASE_KEY_KEY} must both be set, using SQLite");
                sqlite()
            }
        };

        Self {
            backend,
            log_dir: path_or(var(LOG_DIR_KEY), LOG_DIR_KEY, "logs"),
            search_debounce: Duration::from_millis(try_load(var(DEBOUNCE_KEY), DEBOUNCE_KEY, 300u64)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn path_or(value: Option<String>, key: &str, default: &str) -> PathBuf {
    PathBuf::from(value.unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    }))
}

fn try_load<T: FromStr + Display>(value: Option<String>, key: &str, default: T) -> T
where
    T::Err: Display,
{
    match value {
        Some(v) => v.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value: {e}, using default: {default}");
            default
        }),
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
