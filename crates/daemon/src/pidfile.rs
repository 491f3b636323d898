// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pid file handling and process probing for the init-style CLI.

use crate::lifecycle::LifecycleError;
use fs2::FileExt;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Exclusive pid file held for the daemon's lifetime.
///
/// The flock, not the file content, is what guarantees single-instance; the
/// written pid is for the CLI and init scripts.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    _file: File,
}

impl PidFile {
    pub fn acquire(path: &Path) -> Result<Self, LifecycleError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| LifecycleError::PidFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if file.try_lock_exclusive().is_err() {
            return Err(LifecycleError::AlreadyRunning { path: path.to_path_buf() });
        }

        file.set_len(0)
            .and_then(|()| write!(file, "{}", std::process::id()))
            .and_then(|()| file.flush())
            .map_err(|e| LifecycleError::PidFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(Self { path: path.to_path_buf(), _file: file })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Read the pid recorded in a pid file, if any.
pub fn read_pid(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Whether a process with this pid exists (signal 0 probe).
pub fn is_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}

/// The recorded pid, but only while that process is actually alive.
pub fn running_pid(path: &Path) -> Option<i32> {
    read_pid(path).filter(|&pid| is_alive(pid))
}

pub fn send_signal(pid: i32, signal: Signal) -> nix::Result<()> {
    kill(Pid::from_raw(pid), signal)
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
