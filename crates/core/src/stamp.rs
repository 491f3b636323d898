// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stamp files and the freshness wire line.
//!
//! Each syncer persists two epoch-second stamps in the state directory:
//! `<name>_lastchange_stamp` (latest observed local event) and
//! `<name>_success_stamp` (start time of the last fully successful
//! pipeline). The remote helper reads them back as the single-line
//! `"<success>:<lastchange>"` response consumed by the freshness check.

use crate::error::StampError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Which of the two per-syncer stamps a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampKind {
    Success,
    Lastchange,
}

impl StampKind {
    pub fn file_name(&self, syncer: &str) -> String {
        match self {
            StampKind::Success => format!("{}_success_stamp", syncer),
            StampKind::Lastchange => format!("{}_lastchange_stamp", syncer),
        }
    }

    pub fn path(&self, state_dir: &Path, syncer: &str) -> PathBuf {
        state_dir.join(self.file_name(syncer))
    }
}

/// Read a stamp file.
///
/// A missing file, an empty file, or content that is not a decimal epoch
/// value all read as unknown. Only a real I/O error on a present file is an
/// error.
pub fn read(path: &Path) -> Result<Option<u64>, StampError> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StampError::Read { path: path.to_path_buf(), source }),
        Ok(content) => Ok(content.trim().parse().ok()),
    }
}

/// Write a stamp file, truncate-and-write. No trailing newline.
pub fn write(path: &Path, value: u64) -> Result<(), StampError> {
    fs::write(path, value.to_string())
        .map_err(|source| StampError::Write { path: path.to_path_buf(), source })
}

/// The `"<success>:<lastchange>"` line exchanged with peers.
///
/// Each field is up to 10 decimal digits and may be empty; an empty field
/// means the peer has no such stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampLine {
    pub success: Option<u64>,
    pub lastchange: Option<u64>,
}

impl StampLine {
    pub fn new(success: Option<u64>, lastchange: Option<u64>) -> Self {
        Self { success, lastchange }
    }

    /// Parse a line of the exact shape `^[0-9]{0,10}:[0-9]{0,10}$`.
    pub fn parse(line: &str) -> Option<Self> {
        let (success, lastchange) = line.split_once(':')?;
        Some(Self {
            success: parse_field(success)?,
            lastchange: parse_field(lastchange)?,
        })
    }

    /// Whether this peer's own state vetoes replication: the peer observed
    /// local changes after its last confirmed sync. Either field empty
    /// means no veto.
    pub fn vetoes(&self) -> bool {
        match (self.success, self.lastchange) {
            (Some(success), Some(lastchange)) => lastchange > success,
            _ => false,
        }
    }
}

impl std::fmt::Display for StampLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn field(f: &mut std::fmt::Formatter<'_>, value: Option<u64>) -> std::fmt::Result {
            match value {
                Some(v) => write!(f, "{}", v),
                None => Ok(()),
            }
        }
        field(f, self.success)?;
        write!(f, ":")?;
        field(f, self.lastchange)
    }
}

fn parse_field(field: &str) -> Option<Option<u64>> {
    if field.is_empty() {
        return Some(None);
    }
    if field.len() > 10 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok().map(Some)
}

#[cfg(test)]
#[path = "stamp_tests.rs"]
mod tests;
