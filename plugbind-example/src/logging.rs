//! Tracing setup for the example binary.
//!
//! Logs go to stderr, or to a file resolved against the host working
//! directory when one is configured. `RUST_LOG` overrides the configured
//! level.

use crate::config::PluginConfig;
use anyhow::{Context, Result};
use plugbind_runtime::PathResolver;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Returns the log file path, if any.
///
/// A second call leaves the first subscriber in place.
pub fn init(config: &PluginConfig, paths: &PathResolver) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let Some(log_file) = &config.log_file else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(io::stderr)
            .try_init();
        return Ok(None);
    };

    let log_path = paths.resolve(log_file);
    let writer = SharedLogFile::new(open_log_file(&log_path)?);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(move || writer.clone())
        .try_init();
    Ok(Some(log_path))
}

/// Open a log file for appending, creating parent directories.
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Shared handle to the log file, cloned once per formatted event.
///
/// Each write takes the lock, so lines from different threads never
/// interleave. A poisoned lock is taken over rather than dropping output.
#[derive(Clone)]
struct SharedLogFile(Arc<Mutex<File>>);

impl SharedLogFile {
    fn new(file: File) -> Self {
        Self(Arc::new(Mutex::new(file)))
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for SharedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock().write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}
