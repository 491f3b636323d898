// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-syncer control task.
//!
//! Everything that serializes a syncer — the lock, the quiescence timer,
//! the watcher subscription, the stamp cache — is owned by this task and
//! mutated only here. Watcher callbacks and timer fires never run pipeline
//! code; they post messages. Pipeline runs happen on worker tasks whose
//! completion comes back as a message too.

pub(crate) mod cron;
pub(crate) mod watcher;

use crate::pipeline::{Pipeline, PipelineError, PipelineOutcome, ShellRunner, SyncRunner};
use crate::reporter::Reporter;
use crate::stamps::StampStore;
use anysyncd_core::{Clock, HandlerKind, PendingSet, SyncerConfig, SystemClock};
use notify::RecommendedWatcher;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

pub(crate) enum SyncerMsg {
    /// Filtered event paths from the watcher.
    Paths(Vec<PathBuf>),
    /// The quiescence timer elapsed.
    QuiesceFired,
    /// The cron schedule ticked.
    CronTick,
    /// A pipeline worker finished.
    PipelineDone(Result<PipelineOutcome, PipelineError>),
}

/// Spawn a production syncer: channel, optional cron task, control task.
pub(crate) fn spawn(config: SyncerConfig, state_dir: &Path) -> JoinHandle<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    if let Some(spec) = config.cron.clone() {
        cron::spawn(&config.name, spec, tx.clone());
    }
    let prefix = match &config.handler {
        HandlerKind::Csync { remote_prefix_command, .. } => remote_prefix_command.clone(),
        HandlerKind::Rsync { .. } => None,
    };
    let syncer = Syncer::new(config, state_dir, tx, ShellRunner::new(prefix), SystemClock);
    tokio::spawn(syncer.run(rx))
}

pub(crate) struct Syncer<R, C> {
    config: SyncerConfig,
    stamps: StampStore,
    pending: PendingSet,
    reporter: Reporter,
    locked: bool,
    timer: Option<JoinHandle<()>>,
    watcher: Option<RecommendedWatcher>,
    tx: UnboundedSender<SyncerMsg>,
    runner: R,
    clock: C,
}

impl<R: SyncRunner, C: Clock> Syncer<R, C> {
    pub(crate) fn new(
        config: SyncerConfig,
        state_dir: &Path,
        tx: UnboundedSender<SyncerMsg>,
        runner: R,
        clock: C,
    ) -> Self {
        let stamps = StampStore::open(state_dir, &config.name);
        let reporter = Reporter::new(&config);
        Self {
            config,
            stamps,
            pending: PendingSet::new(),
            reporter,
            locked: false,
            timer: None,
            watcher: None,
            tx,
            runner,
            clock,
        }
    }

    pub(crate) async fn run(mut self, mut rx: UnboundedReceiver<SyncerMsg>) {
        self.startup();
        while let Some(msg) = rx.recv().await {
            self.handle(msg);
        }
    }

    /// Subscribe the watcher and run the initial full sync.
    pub(crate) fn startup(&mut self) {
        tracing::debug!(
            syncer = %self.config.name,
            success = ?self.stamps.success(),
            lastchange = ?self.stamps.lastchange(),
            "stamps loaded"
        );
        if self.sync_watcher() {
            tracing::info!(syncer = %self.config.name, "paused at startup (noop file absent)");
            return;
        }
        self.start_pipeline(true);
    }

    pub(crate) fn handle(&mut self, msg: SyncerMsg) {
        match msg {
            SyncerMsg::Paths(paths) => self.add_paths(paths),
            SyncerMsg::QuiesceFired => self.quiesce_fired(),
            SyncerMsg::CronTick => self.cron_tick(),
            SyncerMsg::PipelineDone(result) => self.finish_pipeline(result),
        }
    }

    /// Coalescer entry point. The first event after a quiet period stamps
    /// `lastchange` and opens a fixed quiescence window; later events in
    /// the window accumulate without extending it, so a steady trickle of
    /// writes cannot starve the pipeline.
    fn add_paths(&mut self, paths: Vec<PathBuf>) {
        if self.sync_watcher() {
            return;
        }
        self.pending.add(paths);
        if self.timer.is_none() {
            self.stamps.set_lastchange(self.clock.epoch_secs());
            self.arm_timer();
        }
    }

    fn quiesce_fired(&mut self) {
        self.timer = None;
        if self.locked {
            // The running pipeline observes the queue on its next
            // iteration, or a later event re-arms the timer.
            tracing::debug!(syncer = %self.config.name, "quiescence fired while locked, dropped");
            return;
        }
        self.start_pipeline(false);
    }

    fn cron_tick(&mut self) {
        if self.sync_watcher() {
            tracing::debug!(syncer = %self.config.name, "cron tick while paused, skipped");
            return;
        }
        if self.locked || self.timer.is_some() {
            tracing::debug!(syncer = %self.config.name, "cron tick while busy, skipped");
            return;
        }
        self.start_pipeline(true);
    }

    /// Evaluate the noop rule and reconcile the watcher subscription with
    /// it. Returns true when the syncer is paused.
    fn sync_watcher(&mut self) -> bool {
        let paused = self.config.noop_file.as_ref().is_some_and(|file| !file.exists());
        if paused {
            if self.watcher.take().is_some() {
                tracing::info!(syncer = %self.config.name, "noop file absent, watcher paused");
            }
        } else if self.watcher.is_none() {
            match watcher::subscribe(&self.config, self.tx.clone()) {
                Ok(w) => {
                    tracing::info!(
                        syncer = %self.config.name,
                        dir = %self.config.watcher.display(),
                        "watcher subscribed"
                    );
                    self.watcher = Some(w);
                }
                Err(error) => {
                    // Retried on the next trigger; the full-mirror pipeline
                    // covers anything missed meanwhile.
                    tracing::warn!(syncer = %self.config.name, %error, "watcher subscription failed");
                }
            }
        }
        paused
    }

    fn arm_timer(&mut self) {
        let tx = self.tx.clone();
        let window = Duration::from_secs(self.config.waiting_time);
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = tx.send(SyncerMsg::QuiesceFired);
        }));
    }

    fn start_pipeline(&mut self, full_sync: bool) {
        self.locked = true;
        let pipeline = Pipeline {
            name: self.config.name.clone(),
            handler: self.config.handler.clone(),
            retry_interval: Duration::from_secs(self.config.retry_interval),
            pending: self.pending.clone(),
            runner: self.runner.clone(),
            clock: self.clock.clone(),
        };
        tracing::debug!(syncer = %self.config.name, full_sync, "pipeline starting");

        let worker = tokio::spawn(async move { pipeline.run(full_sync).await });
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // The join error branch keeps the lock from leaking if the
            // worker panics.
            let result = match worker.await {
                Ok(result) => result,
                Err(error) => Err(PipelineError::Worker(error.to_string())),
            };
            let _ = tx.send(SyncerMsg::PipelineDone(result));
        });
    }

    fn finish_pipeline(&mut self, result: Result<PipelineOutcome, PipelineError>) {
        self.locked = false;
        match result {
            Ok(PipelineOutcome::Synced { start_ts }) => {
                self.stamps.set_success(start_ts);
                tracing::info!(syncer = %self.config.name, start_ts, "sync complete");
            }
            Ok(PipelineOutcome::Skipped) => {
                tracing::debug!(syncer = %self.config.name, "nothing to sync");
            }
            Err(error) => self.reporter.report(&error.to_string()),
        }
    }

    #[cfg(test)]
    pub(crate) fn locked(&self) -> bool {
        self.locked
    }

    #[cfg(test)]
    pub(crate) fn timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    #[cfg(test)]
    pub(crate) fn watcher_active(&self) -> bool {
        self.watcher.is_some()
    }

    #[cfg(test)]
    pub(crate) fn stamps(&self) -> &StampStore {
        &self.stamps
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
