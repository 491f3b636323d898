// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `anysyncd` - init-style CLI for the replication daemon.
//!
//! Exit codes follow init-script conventions: 0 on success, 3 for
//! `status` when the daemon is not running, 7 for signalling a daemon
//! that is not running.

use anyhow::Context;
use anysyncd_core::config::DEFAULT_CONFIG_PATH;
use anysyncd_core::DaemonConfig;
use anysyncd_daemon::{lifecycle, pidfile};
use clap::{Parser, Subcommand};
use nix::sys::signal::Signal;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "anysyncd", version, about = "Consistent-snapshot filesystem replication daemon")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the daemon
    Start {
        /// Stay attached to the terminal, logging to stderr
        #[arg(long)]
        foreground: bool,
    },
    /// Stop a running daemon
    Stop,
    /// Report whether the daemon is running
    Status,
    /// Stop, then start the daemon
    Restart,
    /// Tell a running daemon to reopen its log file
    Reload,
    /// Run the daemon process in this process (spawned by `start`)
    #[command(hide = true)]
    Run,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("anysyncd: {:#}", error);
            1
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Run => {
            lifecycle::run(&cli.config, false).await?;
            Ok(0)
        }
        Command::Start { foreground: true } => {
            lifecycle::run(&cli.config, true).await?;
            Ok(0)
        }
        Command::Start { foreground: false } => start_background(&cli.config).await,
        Command::Stop => stop(&cli.config).await,
        Command::Status => status(&cli.config),
        Command::Restart => {
            stop(&cli.config).await?;
            start_background(&cli.config).await
        }
        Command::Reload => reload(&cli.config),
    }
}

async fn start_background(config_path: &Path) -> anyhow::Result<i32> {
    let config = DaemonConfig::load(config_path)?;
    if let Some(pid) = pidfile::running_pid(&config.pidfile) {
        println!("anysyncd already running (pid {})", pid);
        return Ok(0);
    }

    let exe = std::env::current_exe().context("cannot locate the anysyncd binary")?;
    std::process::Command::new(exe)
        .arg("--config")
        .arg(config_path)
        .arg("run")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("failed to spawn the daemon")?;

    // Wait for the child to take the pid file.
    for _ in 0..50 {
        if pidfile::running_pid(&config.pidfile).is_some() {
            println!("anysyncd started");
            return Ok(0);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("daemon did not come up; check the log file")
}

async fn stop(config_path: &Path) -> anyhow::Result<i32> {
    let config = DaemonConfig::load(config_path)?;
    let Some(pid) = pidfile::running_pid(&config.pidfile) else {
        println!("anysyncd not running");
        return Ok(0);
    };

    pidfile::send_signal(pid, Signal::SIGTERM)
        .with_context(|| format!("failed to signal pid {}", pid))?;
    for _ in 0..100 {
        if !pidfile::is_alive(pid) {
            println!("anysyncd stopped");
            return Ok(0);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("daemon (pid {}) did not exit after SIGTERM", pid)
}

fn status(config_path: &Path) -> anyhow::Result<i32> {
    let config = DaemonConfig::load(config_path)?;
    match pidfile::running_pid(&config.pidfile) {
        Some(pid) => {
            println!("anysyncd is running (pid {})", pid);
            Ok(0)
        }
        None => {
            println!("anysyncd is not running");
            Ok(3)
        }
    }
}

fn reload(config_path: &Path) -> anyhow::Result<i32> {
    let config = DaemonConfig::load(config_path)?;
    match pidfile::running_pid(&config.pidfile) {
        Some(pid) => {
            pidfile::send_signal(pid, Signal::SIGHUP)
                .with_context(|| format!("failed to signal pid {}", pid))?;
            println!("reload signal sent to pid {}", pid);
            Ok(0)
        }
        None => {
            eprintln!("anysyncd not running");
            Ok(7)
        }
    }
}
