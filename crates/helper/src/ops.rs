// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two helper operations.
//!
//! `commit` is the rename rotation behind the atomic swap: mirror the
//! distributed staging content beside the live tree, rotate the live tree
//! out, rotate the staging tree in, and recycle the old live tree as the
//! next staging area so the following swap stays cheap. A partial failure
//! is not rolled back; the next sync's mirror step recovers.

use anysyncd_core::{stamp, HandlerKind, StampError, StampKind, StampLine, SyncerConfig};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub(crate) enum HelperError {
    #[error("syncer `{syncer}` does not use the two-phase handler")]
    NotTwoPhase { syncer: String },

    #[error("cannot derive sibling paths for `{path}`")]
    BadProdDir { path: PathBuf },

    #[error("mirror into staging failed: {0}")]
    Mirror(String),

    #[error("rename {from} -> {to} failed: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Read both stamps for a syncer. Missing files are empty fields; only an
/// I/O error on a present file fails.
pub(crate) fn stamps_line(state_dir: &Path, syncer: &str) -> Result<StampLine, StampError> {
    Ok(StampLine::new(
        stamp::read(&StampKind::Success.path(state_dir, syncer))?,
        stamp::read(&StampKind::Lastchange.path(state_dir, syncer))?,
    ))
}

/// Mirror the staging content and rotate it into the live tree.
pub(crate) fn commit(syncer: &SyncerConfig) -> Result<(), HelperError> {
    let HandlerKind::Csync { prod_dir, csync_dir, .. } = &syncer.handler else {
        return Err(HelperError::NotTwoPhase { syncer: syncer.name.clone() });
    };
    let staging = staging_path(prod_dir)?;
    mirror(csync_dir, &staging)?;
    rotate(prod_dir, &staging)
}

/// The staging sibling: `.<basename>.tmp` next to the live tree.
pub(crate) fn staging_path(prod: &Path) -> Result<PathBuf, HelperError> {
    sibling(prod, ".", ".tmp")
}

/// The rotation backup: `<basename>.bak` next to the live tree.
fn backup_path(prod: &Path) -> Result<PathBuf, HelperError> {
    sibling(prod, "", ".bak")
}

fn sibling(prod: &Path, prefix: &str, suffix: &str) -> Result<PathBuf, HelperError> {
    let name = prod
        .file_name()
        .ok_or_else(|| HelperError::BadProdDir { path: prod.to_path_buf() })?;
    let mut sibling = OsString::from(prefix);
    sibling.push(name);
    sibling.push(suffix);
    Ok(prod.with_file_name(sibling))
}

fn mirror(csync: &Path, staging: &Path) -> Result<(), HelperError> {
    let mut source = OsString::from(csync);
    source.push("/");
    let output = Command::new("rsync")
        .arg("--archive")
        .arg("--delete")
        .arg("--checksum")
        .arg(source)
        .arg(staging)
        .output()
        .map_err(|e| HelperError::Mirror(format!("`rsync` execution error: {}", e)))?;
    if output.status.success() {
        return Ok(());
    }
    let exit_code = output.status.code().unwrap_or(-1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        Err(HelperError::Mirror(format!("`rsync` failed (exit {})", exit_code)))
    } else {
        Err(HelperError::Mirror(format!("`rsync` failed (exit {}): {}", exit_code, stderr)))
    }
}

/// The rename pair: on steady state the previous live tree becomes the
/// next staging area.
fn rotate(prod: &Path, staging: &Path) -> Result<(), HelperError> {
    let backup = backup_path(prod)?;
    if prod.exists() {
        rename(prod, &backup)?;
    }
    rename(staging, prod)?;
    if backup.exists() {
        rename(&backup, staging)?;
    }
    Ok(())
}

fn rename(from: &Path, to: &Path) -> Result<(), HelperError> {
    fs::rename(from, to).map_err(|source| HelperError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
