// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic full-sync trigger.
//!
//! A dedicated task sleeps until the schedule's next fire time and posts a
//! tick into the syncer channel. The control task decides whether a tick
//! actually starts a pipeline.

use super::SyncerMsg;
use anysyncd_core::CronSpec;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

pub(crate) fn next_fire(spec: &CronSpec, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    spec.schedule.after(&after).next()
}

pub(crate) fn spawn(
    syncer: &str,
    spec: CronSpec,
    tx: UnboundedSender<SyncerMsg>,
) -> JoinHandle<()> {
    let syncer = syncer.to_string();
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let Some(next) = next_fire(&spec, now) else {
                tracing::warn!(%syncer, expr = %spec.expr, "cron schedule has no future fires");
                break;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            tracing::debug!(%syncer, expr = %spec.expr, "cron tick");
            if tx.send(SyncerMsg::CronTick).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
