// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the integration specs.

use std::path::PathBuf;
use tempfile::TempDir;

/// A scratch deployment: config file, state directory, pid file.
pub struct Deployment {
    _dir: TempDir,
    pub config_path: PathBuf,
    pub state_dir: PathBuf,
    pub pidfile: PathBuf,
}

impl Deployment {
    /// Write a config with a `[global]` section pointing at scratch paths,
    /// followed by the given syncer sections.
    pub fn new(sections: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let state_dir = dir.path().join("state");
        std::fs::create_dir_all(&state_dir).expect("state dir");
        let pidfile = dir.path().join("anysyncd.pid");

        let config_path = dir.path().join("anysyncd.conf");
        let content = format!(
            "[global]\nstate_dir = {}\npidfile = {}\n\n{}",
            state_dir.display(),
            pidfile.display(),
            sections
        );
        std::fs::write(&config_path, content).expect("write config");

        Self { _dir: dir, config_path, state_dir, pidfile }
    }

    pub fn helper(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("anysyncd-helper").expect("helper binary");
        cmd.arg("--config").arg(&self.config_path);
        cmd
    }

    pub fn daemon(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("anysyncd").expect("daemon binary");
        cmd.arg("--config").arg(&self.config_path);
        cmd
    }
}
