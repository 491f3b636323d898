// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon CLI specs: status codes and a foreground lifecycle round trip.

use super::prelude::Deployment;
use serial_test::serial;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

#[test]
fn status_reports_not_running_with_exit_3() {
    let deploy = Deployment::new("");
    let output = deploy.daemon().arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stdout).contains("not running"));
}

#[test]
fn stop_when_not_running_succeeds() {
    let deploy = Deployment::new("");
    let output = deploy.daemon().arg("stop").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("not running"));
}

#[test]
fn reload_when_not_running_exits_7() {
    let deploy = Deployment::new("");
    let output = deploy.daemon().arg("reload").output().unwrap();
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn missing_config_file_fails() {
    let mut cmd = assert_cmd::Command::cargo_bin("anysyncd").unwrap();
    let output = cmd.args(["--config", "/nonexistent/anysyncd.conf", "status"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read config file"), "stderr: {stderr}");
}

fn spawn_foreground(deploy: &Deployment) -> Child {
    Command::new(assert_cmd::cargo::cargo_bin("anysyncd"))
        .arg("--config")
        .arg(&deploy.config_path)
        .args(["start", "--foreground"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn daemon")
}

fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(15);
    while Instant::now() < deadline {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    panic!("timed out waiting for {}", what);
}

#[test]
#[serial]
fn foreground_daemon_runs_until_sigterm() {
    let deploy = Deployment::new("");
    let mut child = spawn_foreground(&deploy);

    wait_for("pid file", || deploy.pidfile.exists());
    let pid = std::fs::read_to_string(&deploy.pidfile).unwrap().trim().to_string();

    // While running, status sees it.
    let output = deploy.daemon().arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(0), "status while running");

    Command::new("kill").arg(&pid).status().expect("send SIGTERM");
    wait_for("daemon exit", || matches!(child.try_wait(), Ok(Some(_))));

    let status = child.wait().unwrap();
    assert!(status.success(), "daemon exit status: {status:?}");
    // Graceful shutdown removes the pid file.
    assert!(!deploy.pidfile.exists());
}

#[test]
#[serial]
fn stop_terminates_a_running_daemon() {
    let deploy = Deployment::new("");
    let mut child = spawn_foreground(&deploy);
    wait_for("pid file", || deploy.pidfile.exists());

    let output = deploy.daemon().arg("stop").output().unwrap();
    assert_eq!(output.status.code(), Some(0), "stop exit code");

    wait_for("daemon exit", || matches!(child.try_wait(), Ok(Some(_))));
    let output = deploy.daemon().arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(3), "status after stop");
}
