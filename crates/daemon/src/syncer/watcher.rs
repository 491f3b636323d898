// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem event subscription for one syncer.
//!
//! The notify callback runs on notify's own thread; it filters paths and
//! forwards survivors into the syncer channel. Missed events are not
//! reconstructed — the pipeline's full-mirror semantics are authoritative.

use super::SyncerMsg;
use anysyncd_core::SyncerConfig;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// Subscribe recursively to the syncer's watch directory.
///
/// The returned watcher unsubscribes on drop.
pub(crate) fn subscribe(
    config: &SyncerConfig,
    tx: UnboundedSender<SyncerMsg>,
) -> notify::Result<RecommendedWatcher> {
    let owner = config.clone();
    let mut watcher =
        notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let paths: Vec<PathBuf> =
                    event.paths.into_iter().filter(|path| !owner.is_filtered(path)).collect();
                if !paths.is_empty() {
                    let _ = tx.send(SyncerMsg::Paths(paths));
                }
            }
            Err(error) => {
                tracing::warn!(syncer = %owner.name, %error, "watcher event error");
            }
        })?;
    watcher.watch(&config.watcher, RecursiveMode::Recursive)?;
    Ok(watcher)
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
