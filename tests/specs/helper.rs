// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote helper specs: stamp reporting and argument handling.

use super::prelude::Deployment;
use anysyncd_core::{stamp, StampKind};

#[test]
fn stamps_reports_written_values() {
    let deploy = Deployment::new("");
    stamp::write(&StampKind::Success.path(&deploy.state_dir, "data"), 1700000000).unwrap();
    stamp::write(&StampKind::Lastchange.path(&deploy.state_dir, "data"), 1700000042).unwrap();

    deploy
        .helper()
        .args(["stamps", "data"])
        .assert()
        .success()
        .stdout("1700000000:1700000042\n");
}

#[test]
fn stamps_reports_empty_fields_for_missing_files() {
    let deploy = Deployment::new("");
    deploy.helper().args(["stamps", "data"]).assert().success().stdout(":\n");
}

#[test]
fn stamps_reports_one_sided_state() {
    let deploy = Deployment::new("");
    stamp::write(&StampKind::Lastchange.path(&deploy.state_dir, "data"), 99).unwrap();
    deploy.helper().args(["stamps", "data"]).assert().success().stdout(":99\n");
}

#[test]
fn garbage_stamp_content_reads_as_unknown() {
    let deploy = Deployment::new("");
    std::fs::write(StampKind::Success.path(&deploy.state_dir, "data"), "yesterday").unwrap();
    deploy.helper().args(["stamps", "data"]).assert().success().stdout(":\n");
}

#[test]
fn commit_refuses_an_unconfigured_syncer() {
    let deploy = Deployment::new("");
    let output = deploy.helper().args(["commit", "ghost"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no syncer named `ghost`"), "stderr: {stderr}");
}

#[test]
fn commit_refuses_a_local_mirror_syncer() {
    let deploy = Deployment::new(
        "[backup]\nhandler = rsync\nwatcher = /srv/data\nfrom = /srv/data\nto = /backup\n",
    );
    let output = deploy.helper().args(["commit", "backup"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("two-phase"), "stderr: {stderr}");
}

#[test]
fn missing_action_is_a_usage_error() {
    let deploy = Deployment::new("");
    deploy.helper().assert().code(2);
}

#[test]
fn unreadable_config_fails() {
    let mut cmd = assert_cmd::Command::cargo_bin("anysyncd-helper").unwrap();
    let output =
        cmd.args(["--config", "/nonexistent/anysyncd.conf", "stamps", "data"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read config file"), "stderr: {stderr}");
}
