// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-syncer consistency pipeline.
//!
//! One run moves through local-mirror, freshness-check, distribute, and
//! commit. The local-mirror loop repeats until an attempt completes with no
//! mirror error and no change events observed during the attempt, which is
//! what makes the snapshot that leaves this host consistent. The network
//! phases only ever see such a snapshot.

mod runner;

pub(crate) use runner::{ShellRunner, SyncRunner};

use anysyncd_core::{Clock, HandlerKind, PendingSet, StampLine};
use std::path::Path;
use std::time::Duration;

/// Safety ceiling for the local-mirror loop. This bounds pathological write
/// loads, it is not a transport retry policy.
pub(crate) const MAX_MIRROR_ATTEMPTS: u32 = 100;

/// What a finished pipeline run tells the control task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipelineOutcome {
    /// Nothing queued and not a full sync; no phase ran.
    Skipped,
    /// Every phase succeeded. `start_ts` is the epoch second captured just
    /// before the final successful mirror and becomes the success stamp.
    Synced { start_ts: u64 },
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum PipelineError {
    #[error("could not achieve a consistent local sync state after {0} retries")]
    RetriesExhausted(u32),

    /// The peer observed local changes after its last confirmed sync;
    /// overwriting it would lose them.
    #[error("peer {host} has local changes newer than its last sync, refusing to overwrite")]
    PeerNotFresh { host: String },

    #[error("stamps query on {host} failed: {message}")]
    PeerTransport { host: String, message: String },

    #[error("malformed stamps response from {host}: `{line}`")]
    PeerResponse { host: String, line: String },

    #[error("group replication failed: {0}")]
    Distribute(String),

    #[error("commit failed: {0}")]
    Commit(String),

    /// The worker task died before producing a result.
    #[error("pipeline worker failed: {0}")]
    Worker(String),
}

/// One pipeline run's context, handed to a worker task.
pub(crate) struct Pipeline<R, C> {
    pub(crate) name: String,
    pub(crate) handler: HandlerKind,
    pub(crate) retry_interval: Duration,
    pub(crate) pending: PendingSet,
    pub(crate) runner: R,
    pub(crate) clock: C,
}

impl<R: SyncRunner, C: Clock> Pipeline<R, C> {
    pub(crate) async fn run(&self, full_sync: bool) -> Result<PipelineOutcome, PipelineError> {
        if !full_sync && self.pending.is_empty() {
            return Ok(PipelineOutcome::Skipped);
        }

        let (from, to) = match &self.handler {
            HandlerKind::Rsync { from, to } => (from.clone(), to.clone()),
            HandlerKind::Csync { prod_dir, csync_dir, .. } => {
                (prod_dir.clone(), csync_dir.clone())
            }
        };

        let start_ts = self.local_mirror_loop(&from, &to).await?;

        if let HandlerKind::Csync { remote_hosts, group, .. } = &self.handler {
            self.freshness_check(remote_hosts).await?;
            tracing::debug!(syncer = %self.name, %group, "distributing staging tree");
            self.runner.distribute(group).await.map_err(PipelineError::Distribute)?;
            self.commit(remote_hosts).await?;
        }

        Ok(PipelineOutcome::Synced { start_ts })
    }

    /// Mirror until an attempt is conclusive: no mirror error, and nothing
    /// new queued between the drain and the post-mirror check.
    async fn local_mirror_loop(&self, from: &Path, to: &Path) -> Result<u64, PipelineError> {
        for attempt in 1..=MAX_MIRROR_ATTEMPTS {
            let drained = self.pending.drain();
            let start_ts = self.clock.epoch_secs();
            let started = self.clock.now();
            tracing::debug!(
                syncer = %self.name,
                attempt,
                drained = drained.len(),
                "starting local mirror"
            );

            match self.runner.mirror(from, to).await {
                Ok(()) if self.pending.is_empty() => return Ok(start_ts),
                Ok(()) => {
                    tracing::debug!(
                        syncer = %self.name,
                        queued = self.pending.len(),
                        "changes arrived during mirror, retrying"
                    );
                }
                Err(message) => {
                    tracing::warn!(syncer = %self.name, %message, "local mirror attempt failed");
                }
            }

            // Keep a minimum spacing of retry_interval between attempt
            // start times.
            let elapsed = self.clock.now().saturating_duration_since(started);
            if let Some(remaining) = self.retry_interval.checked_sub(elapsed) {
                tokio::time::sleep(remaining).await;
            }
        }

        Err(PipelineError::RetriesExhausted(MAX_MIRROR_ATTEMPTS))
    }

    /// Refuse to overwrite any peer whose own lastchange is ahead of its
    /// last confirmed sync.
    async fn freshness_check(&self, hosts: &[String]) -> Result<(), PipelineError> {
        for host in hosts {
            let raw = self
                .runner
                .remote_stamps(host, &self.name)
                .await
                .map_err(|message| PipelineError::PeerTransport {
                    host: host.clone(),
                    message,
                })?;
            let line = raw.trim();
            let stamps = StampLine::parse(line).ok_or_else(|| PipelineError::PeerResponse {
                host: host.clone(),
                line: line.to_string(),
            })?;
            if stamps.vetoes() {
                return Err(PipelineError::PeerNotFresh { host: host.clone() });
            }
            tracing::debug!(syncer = %self.name, %host, %stamps, "peer is fresh");
        }
        Ok(())
    }

    /// Swap the live tree on every peer. Hosts that already committed stay
    /// committed even when a later host fails; the error names the failing
    /// hosts only.
    async fn commit(&self, hosts: &[String]) -> Result<(), PipelineError> {
        let mut failures = Vec::new();
        for host in hosts {
            match self.runner.remote_commit(host, &self.name).await {
                Ok(()) => tracing::info!(syncer = %self.name, %host, "committed"),
                Err(message) => {
                    tracing::error!(syncer = %self.name, %host, %message, "commit failed");
                    failures.push(format!("{}: {}", host, message));
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Commit(failures.join("; ")))
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
