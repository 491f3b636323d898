// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log setup.
//!
//! Foreground runs log to stderr. Daemonized runs log to the configured
//! file through a reopenable handle so SIGHUP can pick up a rotated file
//! without restarting.

use crate::lifecycle::LifecycleError;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub(crate) struct LogHandle {
    file: Option<Arc<ReopenableFile>>,
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl LogHandle {
    /// Swap in a fresh handle to the log path. No-op for stderr logging.
    pub(crate) fn reopen(&self) {
        let Some(file) = &self.file else { return };
        match file.reopen() {
            Ok(()) => tracing::info!(path = %file.path.display(), "log file reopened"),
            Err(error) => tracing::warn!(%error, "failed to reopen log file"),
        }
    }
}

pub(crate) fn init(logfile: Option<&Path>, loglevel: &str) -> Result<LogHandle, LifecycleError> {
    let filter = EnvFilter::new(loglevel);
    match logfile {
        Some(path) => {
            let file = Arc::new(ReopenableFile::open(path)?);
            let (writer, guard) = tracing_appender::non_blocking(SharedWriter(file.clone()));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Ok(LogHandle { file: Some(file), _guard: Some(guard) })
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init();
            Ok(LogHandle { file: None, _guard: None })
        }
    }
}

/// An append handle that can be swapped for a fresh one after rotation.
#[derive(Debug)]
pub(crate) struct ReopenableFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl ReopenableFile {
    pub(crate) fn open(path: &Path) -> Result<Self, LifecycleError> {
        let file = open_append(path).map_err(|source| LifecycleError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { path: path.to_path_buf(), file: Mutex::new(file) })
    }

    pub(crate) fn reopen(&self) -> io::Result<()> {
        let fresh = open_append(&self.path)?;
        *self.file.lock() = fresh;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `Write` view over the shared reopenable file, for the non-blocking
/// appender worker.
struct SharedWriter(Arc<ReopenableFile>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.file.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.file.lock().flush()
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
