// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External primitives the pipeline drives: the local mirror, the group
//! replication transport, and the remote helper invocation.
//!
//! The pipeline only sees the [`SyncRunner`] trait, so the state machine is
//! exercised in tests with a scripted runner and none of the external tools
//! need to exist.

use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;

/// The four external operations a pipeline run performs.
pub(crate) trait SyncRunner: Clone + Send + Sync + 'static {
    /// Mirror `from` into `to` (archive + delete + checksum) and verify the
    /// trees are equal afterwards.
    fn mirror(
        &self,
        from: &Path,
        to: &Path,
    ) -> impl std::future::Future<Output = Result<(), String>> + Send;

    /// Query a peer's stamps for `syncer`. Returns the raw stdout.
    fn remote_stamps(
        &self,
        host: &str,
        syncer: &str,
    ) -> impl std::future::Future<Output = Result<String, String>> + Send;

    /// Replicate the staging tree across the configured group.
    fn distribute(
        &self,
        group: &str,
    ) -> impl std::future::Future<Output = Result<(), String>> + Send;

    /// Run the commit swap on a peer.
    fn remote_commit(
        &self,
        host: &str,
        syncer: &str,
    ) -> impl std::future::Future<Output = Result<(), String>> + Send;
}

/// Production runner: rsync for the mirror, csync2 for distribution, ssh
/// for the remote helper.
#[derive(Debug, Clone)]
pub(crate) struct ShellRunner {
    remote_prefix_command: Option<String>,
}

impl ShellRunner {
    pub(crate) fn new(remote_prefix_command: Option<String>) -> Self {
        Self { remote_prefix_command }
    }

    fn helper_command(&self, action: &str, syncer: &str) -> String {
        match &self.remote_prefix_command {
            Some(prefix) => format!("{} anysyncd-helper {} {}", prefix, action, syncer),
            None => format!("anysyncd-helper {} {}", action, syncer),
        }
    }

    async fn ssh(&self, host: &str, command: String) -> Result<String, String> {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o").arg("BatchMode=yes").arg(host).arg(command);
        let output = run_checked(cmd, "ssh").await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SyncRunner for ShellRunner {
    async fn mirror(&self, from: &Path, to: &Path) -> Result<(), String> {
        let mut cmd = Command::new("rsync");
        cmd.arg("--archive")
            .arg("--delete")
            .arg("--checksum")
            .arg(dir_arg(from))
            .arg(to);
        run_checked(cmd, "rsync").await?;

        // Equality check: a dry run over the freshly mirrored trees must
        // report no itemized changes.
        let mut verify = Command::new("rsync");
        verify
            .arg("--archive")
            .arg("--delete")
            .arg("--checksum")
            .arg("--dry-run")
            .arg("--itemize-changes")
            .arg(dir_arg(from))
            .arg(to);
        let output = run_checked(verify, "rsync").await?;
        let differences = String::from_utf8_lossy(&output.stdout);
        let differences = differences.trim();
        if differences.is_empty() {
            Ok(())
        } else {
            Err(format!("trees differ after mirror: {}", first_line(differences)))
        }
    }

    async fn remote_stamps(&self, host: &str, syncer: &str) -> Result<String, String> {
        self.ssh(host, self.helper_command("stamps", syncer)).await
    }

    async fn distribute(&self, group: &str) -> Result<(), String> {
        let mut cmd = Command::new("csync2");
        cmd.arg("-x").arg("-G").arg(group);
        run_checked(cmd, "csync2").await?;
        Ok(())
    }

    async fn remote_commit(&self, host: &str, syncer: &str) -> Result<(), String> {
        self.ssh(host, self.helper_command("commit", syncer)).await?;
        Ok(())
    }
}

/// Run a command and shape any failure into a message carrying the exit
/// code and trimmed stderr.
pub(crate) async fn run_checked(
    mut cmd: Command,
    program: &str,
) -> Result<std::process::Output, String> {
    match cmd.output().await {
        Ok(output) if output.status.success() => Ok(output),
        Ok(output) => {
            let exit_code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                Err(format!("`{}` failed (exit {})", program, exit_code))
            } else {
                Err(format!("`{}` failed (exit {}): {}", program, exit_code, stderr))
            }
        }
        Err(e) => Err(format!("`{}` execution error: {}", program, e)),
    }
}

/// Source-directory argument with a trailing slash, so rsync replicates the
/// directory's contents rather than the directory itself.
fn dir_arg(dir: &Path) -> OsString {
    let mut arg = OsString::from(dir);
    arg.push("/");
    arg
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default()
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
