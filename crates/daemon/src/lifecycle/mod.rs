// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, signal handling, shutdown.
//!
//! Startup is fatal only for problems that affect every syncer: an
//! unreadable config file, an uncreatable state directory, a held pid
//! file. A syncer section that fails validation is logged and skipped.
//! Shutdown abandons in-flight pipelines; the next startup's full sync
//! re-converges.

use crate::logging::{self, LogHandle};
use crate::pidfile::PidFile;
use crate::syncer;
use anysyncd_core::{ConfigError, DaemonConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create state directory {path}: {source}")]
    StateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to acquire pid file {path}: {message}")]
    PidFile { path: PathBuf, message: String },

    #[error("another anysyncd instance holds the pid file {path}")]
    AlreadyRunning { path: PathBuf },

    #[error("failed to install signal handler: {0}")]
    Signal(std::io::Error),
}

/// Run the daemon until a shutdown signal arrives.
///
/// In foreground mode logs go to stderr and SIGHUP shuts down; daemonized,
/// logs go to the configured file and SIGHUP reopens it.
pub async fn run(config_path: &Path, foreground: bool) -> Result<(), LifecycleError> {
    let config = DaemonConfig::load(config_path)?;
    let logfile = if foreground { None } else { config.logfile.as_deref() };
    let log = logging::init(logfile, &config.loglevel)?;

    std::fs::create_dir_all(&config.state_dir).map_err(|source| LifecycleError::StateDir {
        path: config.state_dir.clone(),
        source,
    })?;
    let _pidfile = PidFile::acquire(&config.pidfile)?;

    tracing::info!(
        config = %config_path.display(),
        state_dir = %config.state_dir.display(),
        syncers = config.syncers.len(),
        "anysyncd starting"
    );
    for error in &config.skipped {
        tracing::error!(%error, "skipping syncer with invalid configuration");
    }
    if config.syncers.is_empty() {
        tracing::warn!("no syncers configured");
    }

    let state_dir = config.state_dir.clone();
    for syncer_config in config.syncers {
        syncer::spawn(syncer_config, &state_dir);
    }

    wait_for_shutdown(log, foreground).await?;
    tracing::info!("anysyncd stopped");
    Ok(())
}

async fn wait_for_shutdown(log: LogHandle, foreground: bool) -> Result<(), LifecycleError> {
    let mut term = signal(SignalKind::terminate()).map_err(LifecycleError::Signal)?;
    let mut int = signal(SignalKind::interrupt()).map_err(LifecycleError::Signal)?;
    let mut hup = signal(SignalKind::hangup()).map_err(LifecycleError::Signal)?;

    loop {
        tokio::select! {
            _ = term.recv() => {
                tracing::info!("SIGTERM received, shutting down");
                return Ok(());
            }
            _ = int.recv() => {
                tracing::info!("SIGINT received, shutting down");
                return Ok(());
            }
            _ = hup.recv() => {
                if foreground {
                    tracing::info!("SIGHUP received in foreground, shutting down");
                    return Ok(());
                }
                log.reopen();
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
