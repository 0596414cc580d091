//! Rolling file logger
//!
//! Installs a `tracing` subscriber that writes to `<dir>/<app>.log`, rotating
//! to `<app>.1.log`, `<app>.2.log`, ... once the current file grows past a size
//! limit. The most recent lines are also kept in memory for an in-app viewer.
//! `log` records are bridged into the same subscriber.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

static LOGGER: OnceLock<RollingLogger> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub dir: PathBuf,
    pub app_name: String,
    /// Rotate once the current file would exceed this many bytes
    pub max_file_size: u64,
    /// Rotated files kept besides the current one
    pub max_files: usize,
    /// Lines kept in memory
    pub buffer_lines: usize,
}

impl LoggerConfig {
    pub fn new(dir: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            app_name: app_name.into(),
            max_file_size: 5 * 1024 * 1024,
            max_files: 3,
            buffer_lines: 500,
        }
    }

    fn file_path(&self, index: usize) -> PathBuf {
        if index == 0 {
            self.dir.join(format!("{}.log", self.app_name))
        } else {
            self.dir.join(format!("{}.{}.log", self.app_name, index))
        }
    }
}

struct State {
    file: Option<File>,
    written: u64,
    recent: VecDeque<String>,
}

/// Size-rotated log file plus a ring buffer of recent lines
#[derive(Clone)]
pub struct RollingLogger {
    config: Arc<LoggerConfig>,
    state: Arc<Mutex<State>>,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl RollingLogger {
    pub fn open(config: LoggerConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.dir)?;
        let path = config.file_path(0);
        let file = open_append(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            state: Arc::new(Mutex::new(State {
                file: Some(file),
                written,
                recent: VecDeque::with_capacity(config.buffer_lines),
            })),
            config: Arc::new(config),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Path of the file currently written to
    pub fn current_path(&self) -> PathBuf {
        self.config.file_path(0)
    }

    pub fn recent(&self) -> Vec<String> {
        self.lock().recent.iter().cloned().collect()
    }

    fn rotate(&self, state: &mut State) -> io::Result<()> {
        state.file = None;
        let oldest = self.config.file_path(self.config.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (0..self.config.max_files).rev() {
            let from = self.config.file_path(index);
            if from.exists() {
                fs::rename(&from, self.config.file_path(index + 1))?;
            }
        }
        state.file = Some(open_append(&self.config.file_path(0))?);
        state.written = 0;
        Ok(())
    }

    fn write_record(&self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        let len = buf.len() as u64;
        if state.written > 0 && state.written + len > self.config.max_file_size {
            if self.config.max_files == 0 {
                // No history kept: start the file over
                state.file = Some(File::create(self.config.file_path(0))?);
                state.written = 0;
            } else {
                self.rotate(&mut state)?;
            }
        }
        if let Some(file) = state.file.as_mut() {
            file.write_all(buf)?;
        }
        state.written += len;

        let text = String::from_utf8_lossy(buf);
        for line in text.lines().filter(|l| !l.is_empty()) {
            if state.recent.len() == self.config.buffer_lines {
                state.recent.pop_front();
            }
            if self.config.buffer_lines > 0 {
                state.recent.push_back(line.to_string());
            }
        }
        Ok(())
    }
}

/// Writer handed to the fmt layer for a single event
pub struct RecordWriter {
    logger: RollingLogger,
}

impl Write for RecordWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.logger.write_record(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.logger.lock().file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RollingLogger {
    type Writer = RecordWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RecordWriter { logger: self.clone() }
    }
}

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init_logger(dir: impl Into<PathBuf>, app_name: &str) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = RollingLogger::open(LoggerConfig::new(dir, app_name))
        .map_err(|e| format!("Failed to open log file: {}", e))?;

    tracing_subscriber::fmt()
        .with_writer(logger.clone())
        .with_timer(LocalTime)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| format!("Failed to install logger: {}", e))?;

    let _ = LOGGER.set(logger);
    log::info!("Logging to {}", dir_display(LOGGER.get()));
    Ok(())
}

fn dir_display(logger: Option<&RollingLogger>) -> String {
    logger
        .map(|l| l.current_path().display().to_string())
        .unwrap_or_default()
}

fn ensure_init() -> Result<(), String> {
    LOGGER
        .get()
        .map(|_| ())
        .ok_or_else(|| "Logger not initialized".to_string())
}

pub fn info(message: &str) -> Result<(), String> {
    ensure_init()?;
    tracing::info!("{}", message);
    Ok(())
}

pub fn warn(message: &str) -> Result<(), String> {
    ensure_init()?;
    tracing::warn!("{}", message);
    Ok(())
}

pub fn error(message: &str) -> Result<(), String> {
    ensure_init()?;
    tracing::error!("{}", message);
    Ok(())
}

/// Recent lines from the global logger, oldest first
pub fn recent_logs() -> Vec<String> {
    LOGGER.get().map(RollingLogger::recent).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(dir: &Path) -> LoggerConfig {
        LoggerConfig {
            max_file_size: 32,
            max_files: 2,
            buffer_lines: 3,
            ..LoggerConfig::new(dir, "app")
        }
    }

    fn write(logger: &RollingLogger, line: &str) {
        logger.make_writer().write_all(format!("{}\n", line).as_bytes()).unwrap();
    }

    #[test]
    fn test_rotates_and_caps_history() {
        let dir = tempfile::tempdir().unwrap();
        let logger = RollingLogger::open(small(dir.path())).unwrap();

        for i in 0..8 {
            write(&logger, &format!("line number {:02}", i));
        }

        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("app.1.log").exists());
        assert!(dir.path().join("app.2.log").exists());
        assert!(!dir.path().join("app.3.log").exists());

        let current = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert!(current.contains("line number 07"));
        assert!(current.len() as u64 <= 32);
    }

    #[test]
    fn test_ring_buffer_keeps_latest() {
        let dir = tempfile::tempdir().unwrap();
        let logger = RollingLogger::open(small(dir.path())).unwrap();
        for i in 0..5 {
            write(&logger, &format!("l{}", i));
        }
        assert_eq!(logger.recent(), vec!["l2", "l3", "l4"]);
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggerConfig::new(dir.path(), "app");
        write(&RollingLogger::open(config.clone()).unwrap(), "first");
        write(&RollingLogger::open(config).unwrap(), "second");
        let content = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_helpers_require_init() {
        if LOGGER.get().is_none() {
            assert!(info("hello").is_err());
            assert!(recent_logs().is_empty());
        }
    }
}
