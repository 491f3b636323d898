// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{syncer_config, FakeRunner};
use anysyncd_core::FakeClock;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

struct Harness {
    syncer: Syncer<FakeRunner, FakeClock>,
    rx: UnboundedReceiver<SyncerMsg>,
    runner: FakeRunner,
    clock: FakeClock,
    _watch_dir: TempDir,
    _state_dir: TempDir,
}

impl Harness {
    fn new(mutate: impl FnOnce(&mut anysyncd_core::SyncerConfig, &Path)) -> Self {
        let watch_dir = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        let clock = FakeClock::new();
        let runner = FakeRunner::new(&clock);

        let mut config = syncer_config("data");
        config.watcher = watch_dir.path().to_path_buf();
        mutate(&mut config, state_dir.path());

        let (tx, rx) = mpsc::unbounded_channel();
        let syncer = Syncer::new(config, state_dir.path(), tx, runner.clone(), clock.clone());
        Self { syncer, rx, runner, clock, _watch_dir: watch_dir, _state_dir: state_dir }
    }

    fn default() -> Self {
        Self::new(|_, _| {})
    }

    async fn recv_done(&mut self) -> Result<PipelineOutcome, PipelineError> {
        let msg = tokio::time::timeout(Duration::from_secs(600), self.rx.recv())
            .await
            .expect("timed out waiting for pipeline completion")
            .expect("syncer channel closed");
        match msg {
            SyncerMsg::PipelineDone(result) => result,
            _ => panic!("expected PipelineDone"),
        }
    }

    /// Let every spawned worker finish, then assert no completion message
    /// is queued.
    async fn assert_no_pipeline_ran(&mut self) {
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(self.rx.try_recv().is_err(), "unexpected pipeline completion queued");
    }

    fn event(&mut self, path: &str) {
        self.syncer.handle(SyncerMsg::Paths(vec![PathBuf::from(path)]));
    }
}

#[tokio::test]
async fn first_event_stamps_lastchange_and_arms_the_window() {
    let mut h = Harness::default();
    h.clock.set_epoch_secs(500);
    h.event("/srv/data/a");

    assert!(h.syncer.timer_armed());
    assert_eq!(h.syncer.stamps().lastchange(), Some(500));
    assert!(!h.syncer.locked());

    // Later events in the same window accumulate but do not restamp or
    // extend the window.
    h.clock.set_epoch_secs(503);
    h.event("/srv/data/b");
    assert_eq!(h.syncer.stamps().lastchange(), Some(500));
    assert_eq!(h.syncer.pending.len(), 2);
}

#[tokio::test]
async fn events_subscribe_the_watcher_lazily() {
    let mut h = Harness::default();
    assert!(!h.syncer.watcher_active());
    h.event("/srv/data/a");
    assert!(h.syncer.watcher_active());
}

#[tokio::test(start_paused = true)]
async fn quiescence_fire_runs_the_pipeline_and_stamps_success() {
    let mut h = Harness::default();
    h.clock.set_epoch_secs(800);
    h.event("/srv/data/a");
    h.syncer.handle(SyncerMsg::QuiesceFired);

    assert!(h.syncer.locked());
    assert!(!h.syncer.timer_armed());

    let result = h.recv_done().await;
    h.syncer.handle(SyncerMsg::PipelineDone(result));

    assert!(!h.syncer.locked());
    assert_eq!(h.syncer.stamps().success(), Some(800));
    assert_eq!(h.runner.mirror_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn fire_while_locked_is_dropped() {
    let mut h = Harness::default();
    h.event("/srv/data/a");
    h.syncer.handle(SyncerMsg::QuiesceFired);
    assert!(h.syncer.locked());

    // A second fire while the pipeline runs must not start another worker.
    h.syncer.handle(SyncerMsg::QuiesceFired);

    let result = h.recv_done().await;
    h.syncer.handle(SyncerMsg::PipelineDone(result));
    h.assert_no_pipeline_ran().await;
}

#[tokio::test(start_paused = true)]
async fn quiesce_fire_with_empty_queue_skips() {
    let mut h = Harness::default();
    h.syncer.handle(SyncerMsg::QuiesceFired);

    let result = h.recv_done().await;
    assert_eq!(result.unwrap(), PipelineOutcome::Skipped);
    h.syncer.handle(SyncerMsg::PipelineDone(Ok(PipelineOutcome::Skipped)));

    assert!(!h.syncer.locked());
    assert_eq!(h.syncer.stamps().success(), None);
    assert_eq!(h.runner.mirror_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cron_tick_runs_a_full_sync_when_idle() {
    let mut h = Harness::default();
    h.clock.set_epoch_secs(900);
    h.syncer.handle(SyncerMsg::CronTick);
    assert!(h.syncer.locked());

    let result = h.recv_done().await;
    assert_eq!(result.unwrap(), PipelineOutcome::Synced { start_ts: 900 });
    assert_eq!(h.runner.mirror_calls(), 1);
}

#[tokio::test]
async fn cron_tick_yields_to_an_armed_window() {
    let mut h = Harness::default();
    h.event("/srv/data/a");
    assert!(h.syncer.timer_armed());

    h.syncer.handle(SyncerMsg::CronTick);
    assert!(!h.syncer.locked());
}

#[tokio::test(start_paused = true)]
async fn cron_tick_while_locked_is_skipped() {
    let mut h = Harness::default();
    h.syncer.handle(SyncerMsg::CronTick);
    assert!(h.syncer.locked());
    h.syncer.handle(SyncerMsg::CronTick);

    let result = h.recv_done().await;
    h.syncer.handle(SyncerMsg::PipelineDone(result));
    h.assert_no_pipeline_ran().await;
}

#[tokio::test(start_paused = true)]
async fn startup_runs_one_full_sync() {
    let mut h = Harness::default();
    h.clock.set_epoch_secs(100);
    h.syncer.startup();

    assert!(h.syncer.watcher_active());
    assert!(h.syncer.locked());
    let result = h.recv_done().await;
    assert_eq!(result.unwrap(), PipelineOutcome::Synced { start_ts: 100 });
}

#[tokio::test(start_paused = true)]
async fn pipeline_failure_unlocks_without_stamping() {
    let mut h = Harness::default();
    h.runner.inner.lock().mirror_fails_by_default = true;
    h.event("/srv/data/a");
    h.syncer.handle(SyncerMsg::QuiesceFired);

    let result = h.recv_done().await;
    assert!(matches!(result, Err(PipelineError::RetriesExhausted(100))));
    h.syncer.handle(SyncerMsg::PipelineDone(result));

    assert!(!h.syncer.locked());
    assert_eq!(h.syncer.stamps().success(), None);
}

#[tokio::test(start_paused = true)]
async fn noop_file_absent_pauses_the_syncer() {
    let mut h = Harness::new(|config, state_dir| {
        config.noop_file = Some(state_dir.join("resume"));
    });
    h.syncer.startup();

    assert!(!h.syncer.watcher_active());
    assert!(!h.syncer.locked());

    // Add-path is a no-op while paused: no queue, no timer, no stamp.
    h.event("/srv/data/a");
    assert!(h.syncer.pending.is_empty());
    assert!(!h.syncer.timer_armed());
    assert_eq!(h.syncer.stamps().lastchange(), None);
    h.assert_no_pipeline_ran().await;
}

#[tokio::test]
async fn noop_file_reappearing_resumes_the_syncer() {
    let noop_path = std::sync::Arc::new(parking_lot::Mutex::new(PathBuf::new()));
    let shared = noop_path.clone();
    let mut h = Harness::new(move |config, state_dir| {
        let path = state_dir.join("resume");
        *shared.lock() = path.clone();
        config.noop_file = Some(path);
    });

    h.event("/srv/data/a");
    assert!(!h.syncer.watcher_active());

    std::fs::write(&*noop_path.lock(), b"").unwrap();
    h.event("/srv/data/a");
    assert!(h.syncer.watcher_active());
    assert!(h.syncer.timer_armed());
    assert_eq!(h.syncer.pending.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cron_tick_while_paused_is_skipped() {
    let mut h = Harness::new(|config, state_dir| {
        config.noop_file = Some(state_dir.join("resume"));
    });
    h.syncer.handle(SyncerMsg::CronTick);
    assert!(!h.syncer.locked());
    h.assert_no_pipeline_ran().await;
}
