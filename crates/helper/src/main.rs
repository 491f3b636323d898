// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `anysyncd-helper` - peer-side helper invoked over ssh by the daemon.
//!
//! Two operations: `stamps` prints the peer's `"<success>:<lastchange>"`
//! line for the freshness check, `commit` swaps the distributed staging
//! tree into the live tree. Errors go to stderr with a non-zero exit.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use anysyncd_core::config::DEFAULT_CONFIG_PATH;
use anysyncd_core::DaemonConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod ops;

#[derive(Parser)]
#[command(name = "anysyncd-helper", version, about = "Peer-side helper for anysyncd")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print "<success>:<lastchange>" for a syncer
    Stamps { syncer: String },
    /// Swap the staging tree into the live tree
    Commit { syncer: String },
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("anysyncd-helper: {:#}", error);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = DaemonConfig::load(&cli.config)?;
    match cli.command {
        Command::Stamps { syncer } => {
            // The stamp files alone decide the answer; an unconfigured
            // syncer simply has no stamps.
            let line = ops::stamps_line(&config.state_dir, &syncer)?;
            println!("{}", line);
        }
        Command::Commit { syncer } => {
            let syncer = config.syncer(&syncer)?;
            ops::commit(syncer)?;
        }
    }
    Ok(())
}
