// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-syncer stamp store.
//!
//! The in-memory values are authoritative for the process lifetime; the
//! files exist for restarts and for the remote helper on peers. Writes are
//! best-effort: a failed write is logged and the cached value stands.

use anysyncd_core::{stamp, StampKind};
use std::path::{Path, PathBuf};

pub(crate) struct StampStore {
    syncer: String,
    success_path: PathBuf,
    lastchange_path: PathBuf,
    success: Option<u64>,
    lastchange: Option<u64>,
}

impl StampStore {
    /// Open the store, seeding the cache from whatever is on disk.
    pub(crate) fn open(state_dir: &Path, syncer: &str) -> Self {
        let success_path = StampKind::Success.path(state_dir, syncer);
        let lastchange_path = StampKind::Lastchange.path(state_dir, syncer);
        Self {
            syncer: syncer.to_string(),
            success: read_or_unknown(&success_path),
            lastchange: read_or_unknown(&lastchange_path),
            success_path,
            lastchange_path,
        }
    }

    pub(crate) fn success(&self) -> Option<u64> {
        self.success
    }

    pub(crate) fn lastchange(&self) -> Option<u64> {
        self.lastchange
    }

    pub(crate) fn set_success(&mut self, ts: u64) {
        Self::store(&self.syncer, &self.success_path, &mut self.success, ts);
    }

    pub(crate) fn set_lastchange(&mut self, ts: u64) {
        Self::store(&self.syncer, &self.lastchange_path, &mut self.lastchange, ts);
    }

    /// Stamps never move backwards; a stale value is dropped.
    fn store(syncer: &str, path: &Path, cache: &mut Option<u64>, ts: u64) {
        if cache.is_some_and(|current| ts < current) {
            tracing::debug!(%syncer, ts, current = ?cache, "ignoring backwards stamp");
            return;
        }
        *cache = Some(ts);
        if let Err(error) = stamp::write(path, ts) {
            tracing::warn!(%syncer, %error, "failed to persist stamp");
        }
    }
}

fn read_or_unknown(path: &Path) -> Option<u64> {
    match stamp::read(path) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(%error, "failed to read stamp, treating as unknown");
            None
        }
    }
}

#[cfg(test)]
#[path = "stamps_tests.rs"]
mod tests;
