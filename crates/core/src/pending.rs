// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pending-path set shared between a syncer's control task and its
//! pipeline worker.
//!
//! The control task inserts paths as events arrive; the pipeline worker
//! drains the set at the start of each local-mirror attempt and re-checks
//! emptiness right after the mirror returns. Both sides go through the same
//! mutex, so "drain" and "was anything added since" are each one atomic
//! step.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    inner: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append paths. Duplicates collapse.
    pub fn add<I: IntoIterator<Item = PathBuf>>(&self, paths: I) {
        self.inner.lock().extend(paths);
    }

    /// Atomically take every queued path, leaving the set empty.
    pub fn drain(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.inner.lock()).into_iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
