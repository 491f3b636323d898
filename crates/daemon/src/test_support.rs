// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles shared by the daemon's unit tests.

use crate::pipeline::SyncRunner;
use anysyncd_core::{FakeClock, HandlerKind, PendingSet, SyncerConfig};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Scripted [`SyncRunner`]. Each mirror step can inject interference paths
/// and advance the fake clock to simulate mirror duration; remote
/// operations answer from per-host tables. Every call is appended to `ops`
/// so tests can assert phase ordering.
#[derive(Clone)]
pub(crate) struct FakeRunner {
    pub(crate) pending: PendingSet,
    pub(crate) clock: FakeClock,
    pub(crate) inner: Arc<Mutex<Inner>>,
}

pub(crate) struct Inner {
    pub(crate) ops: Vec<String>,
    pub(crate) mirror_script: VecDeque<MirrorStep>,
    pub(crate) mirror_fails_by_default: bool,
    pub(crate) always_inject: Option<&'static str>,
    pub(crate) stamps: HashMap<String, Result<String, String>>,
    pub(crate) commits: HashMap<String, Result<(), String>>,
    pub(crate) distribute: Result<(), String>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            ops: Vec::new(),
            mirror_script: VecDeque::new(),
            mirror_fails_by_default: false,
            always_inject: None,
            stamps: HashMap::new(),
            commits: HashMap::new(),
            distribute: Ok(()),
        }
    }
}

pub(crate) struct MirrorStep {
    pub(crate) inject: Vec<&'static str>,
    pub(crate) took_secs: u64,
    pub(crate) result: Result<(), String>,
}

impl Default for MirrorStep {
    fn default() -> Self {
        Self { inject: Vec::new(), took_secs: 0, result: Ok(()) }
    }
}

impl FakeRunner {
    pub(crate) fn new(clock: &FakeClock) -> Self {
        Self {
            pending: PendingSet::new(),
            clock: clock.clone(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub(crate) fn script_mirror(&self, step: MirrorStep) {
        self.inner.lock().mirror_script.push_back(step);
    }

    pub(crate) fn stamps_response(&self, host: &str, response: Result<&str, &str>) {
        self.inner.lock().stamps.insert(
            host.to_string(),
            response.map(str::to_string).map_err(str::to_string),
        );
    }

    pub(crate) fn commit_response(&self, host: &str, response: Result<(), &str>) {
        self.inner.lock().commits.insert(host.to_string(), response.map_err(str::to_string));
    }

    pub(crate) fn ops(&self) -> Vec<String> {
        self.inner.lock().ops.clone()
    }

    pub(crate) fn mirror_calls(&self) -> usize {
        self.ops().iter().filter(|op| op.as_str() == "mirror").count()
    }
}

impl SyncRunner for FakeRunner {
    async fn mirror(&self, _from: &Path, _to: &Path) -> Result<(), String> {
        let mut inner = self.inner.lock();
        inner.ops.push("mirror".to_string());
        let step = inner.mirror_script.pop_front().unwrap_or_else(|| MirrorStep {
            inject: inner.always_inject.into_iter().collect(),
            took_secs: 0,
            result: if inner.mirror_fails_by_default {
                Err("rsync exploded".to_string())
            } else {
                Ok(())
            },
        });
        drop(inner);

        self.clock.advance(Duration::from_secs(step.took_secs));
        self.pending.add(step.inject.iter().copied().map(PathBuf::from));
        step.result
    }

    async fn remote_stamps(&self, host: &str, _syncer: &str) -> Result<String, String> {
        let mut inner = self.inner.lock();
        inner.ops.push(format!("stamps {}", host));
        inner.stamps.get(host).cloned().unwrap_or_else(|| Ok(":".to_string()))
    }

    async fn distribute(&self, group: &str) -> Result<(), String> {
        let mut inner = self.inner.lock();
        inner.ops.push(format!("distribute {}", group));
        inner.distribute.clone()
    }

    async fn remote_commit(&self, host: &str, _syncer: &str) -> Result<(), String> {
        let mut inner = self.inner.lock();
        inner.ops.push(format!("commit {}", host));
        inner.commits.get(host).cloned().unwrap_or(Ok(()))
    }
}

pub(crate) fn rsync_handler() -> HandlerKind {
    HandlerKind::Rsync { from: PathBuf::from("/srv/data"), to: PathBuf::from("/backup/data") }
}

pub(crate) fn csync_handler(hosts: &[&str]) -> HandlerKind {
    HandlerKind::Csync {
        prod_dir: PathBuf::from("/srv/data"),
        csync_dir: PathBuf::from("/srv/.data.csync"),
        remote_hosts: hosts.iter().map(|h| h.to_string()).collect(),
        group: "data".to_string(),
        remote_prefix_command: None,
    }
}

/// A minimal rsync-handler syncer config; tests mutate fields as needed.
pub(crate) fn syncer_config(name: &str) -> SyncerConfig {
    SyncerConfig {
        name: name.to_string(),
        watcher: PathBuf::from("/srv/data"),
        filter: regex::Regex::new(anysyncd_core::config::DEFAULT_FILTER).unwrap(),
        waiting_time: 5,
        retry_interval: 2,
        cron: None,
        noop_file: None,
        admin_from: None,
        admin_to: None,
        handler: rsync_handler(),
    }
}
