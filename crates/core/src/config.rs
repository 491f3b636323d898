// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration model and INI loading.
//!
//! The config file has one `[global]` section plus one section per syncer.
//! Any syncer key may appear in `[global]` as a default. Validation happens
//! once at load time: each section is resolved into a [`SyncerConfig`] with
//! its `handler` string mapped onto the closed [`HandlerKind`] variant, so
//! the rest of the daemon never sees raw strings.

use crate::error::ConfigError;
use ini::Ini;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/anysyncd/anysyncd.conf";
pub const DEFAULT_STATE_DIR: &str = "/var/lib/anysyncd";
pub const DEFAULT_PIDFILE: &str = "/var/run/anysyncd.pid";
pub const DEFAULT_FILTER: &str = r"\.(swp|tmp)$";
pub const DEFAULT_WAITING_TIME: u64 = 5;
pub const DEFAULT_RETRY_INTERVAL: u64 = 2;
pub const DEFAULT_LOGLEVEL: &str = "info";

const LOGLEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Fully loaded daemon configuration.
#[derive(Debug)]
pub struct DaemonConfig {
    /// Log file path; stderr when absent.
    pub logfile: Option<PathBuf>,
    /// Log level name, one of trace/debug/info/warn/error.
    pub loglevel: String,
    /// Directory holding the per-syncer stamp files.
    pub state_dir: PathBuf,
    /// Pid file for the daemon CLI.
    pub pidfile: PathBuf,
    /// Syncers that validated cleanly.
    pub syncers: Vec<SyncerConfig>,
    /// Per-section validation failures. The daemon logs these and carries
    /// on with the remaining syncers.
    pub skipped: Vec<ConfigError>,
}

/// One validated replication unit.
#[derive(Debug, Clone)]
pub struct SyncerConfig {
    /// Section name; unique within the config file.
    pub name: String,
    /// Directory whose events feed this syncer.
    pub watcher: PathBuf,
    /// Event paths matching this pattern are discarded.
    pub filter: Regex,
    /// Quiescence window in seconds.
    pub waiting_time: u64,
    /// Minimum spacing between local-mirror attempts in seconds.
    pub retry_interval: u64,
    /// Periodic full-sync schedule.
    pub cron: Option<CronSpec>,
    /// Cluster-wide pause toggle: when set and the file is absent, the
    /// syncer is paused.
    pub noop_file: Option<PathBuf>,
    pub admin_from: Option<String>,
    pub admin_to: Option<String>,
    pub handler: HandlerKind,
}

/// Closed set of handler variants, mapped from the `handler` key.
#[derive(Debug, Clone)]
pub enum HandlerKind {
    /// Local mirror only: replicate `from` into `to` on this host.
    Rsync { from: PathBuf, to: PathBuf },
    /// Two-phase group replication: mirror into the local staging tree,
    /// distribute to the group, then commit the swap on every peer.
    Csync {
        prod_dir: PathBuf,
        csync_dir: PathBuf,
        remote_hosts: Vec<String>,
        group: String,
        remote_prefix_command: Option<String>,
    },
}

/// A cron schedule together with the expression it was parsed from.
#[derive(Debug, Clone)]
pub struct CronSpec {
    pub expr: String,
    pub schedule: cron::Schedule,
}

impl CronSpec {
    /// Parse a standard 5-field cron expression.
    ///
    /// The cron crate wants a leading seconds field, so a fixed `0` is
    /// prepended before parsing.
    pub fn parse(expr: &str) -> Result<Self, String> {
        let full = format!("0 {}", expr.trim());
        let schedule = cron::Schedule::from_str(&full).map_err(|e| e.to_string())?;
        Ok(Self { expr: expr.trim().to_string(), schedule })
    }
}

impl DaemonConfig {
    /// Load and validate the configuration file.
    ///
    /// Fails only when the file itself cannot be read or parsed. Individual
    /// syncer sections that fail validation land in `skipped`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Read { path: path.to_path_buf(), source },
            ini::Error::Parse(p) => {
                ConfigError::Parse { path: path.to_path_buf(), message: p.to_string() }
            }
        })?;
        Self::from_ini(&ini)
    }

    /// Build the configuration from parsed INI content.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let global = ini.section(Some("global"));
        let get_global = |key: &str| global.and_then(|p| p.get(key));

        let loglevel = match get_global("loglevel") {
            Some(level) if LOGLEVELS.contains(&level) => level.to_string(),
            Some(level) => {
                return Err(ConfigError::InvalidValue {
                    syncer: "global".to_string(),
                    key: "loglevel".to_string(),
                    message: format!("`{}` is not a log level", level),
                })
            }
            None => DEFAULT_LOGLEVEL.to_string(),
        };

        let mut syncers = Vec::new();
        let mut skipped = Vec::new();
        for (section, props) in ini.iter() {
            let name = match section {
                Some("global") | None => continue,
                Some(name) => name,
            };
            let view = SectionView { name, own: props, global };
            match SyncerConfig::from_section(&view) {
                Ok(syncer) => syncers.push(syncer),
                Err(e) => skipped.push(e),
            }
        }

        Ok(Self {
            logfile: get_global("logfile").map(PathBuf::from),
            loglevel,
            state_dir: get_global("state_dir")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            pidfile: get_global("pidfile")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PIDFILE)),
            syncers,
            skipped,
        })
    }

    /// Look up one syncer by name. The remote helper resolves its target
    /// syncer this way.
    pub fn syncer(&self, name: &str) -> Result<&SyncerConfig, ConfigError> {
        self.syncers
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::NoSuchSyncer { syncer: name.to_string() })
    }
}

/// A syncer section with `[global]` fallback for every key.
struct SectionView<'a> {
    name: &'a str,
    own: &'a ini::Properties,
    global: Option<&'a ini::Properties>,
}

impl<'a> SectionView<'a> {
    fn get(&self, key: &str) -> Option<&'a str> {
        self.own.get(key).or_else(|| self.global.and_then(|p| p.get(key)))
    }

    fn require(&self, key: &str) -> Result<&'a str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey {
            syncer: self.name.to_string(),
            key: key.to_string(),
        })
    }

    fn get_secs(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                syncer: self.name.to_string(),
                key: key.to_string(),
                message: format!("`{}` is not a number of seconds", raw),
            }),
        }
    }

    fn invalid(&self, key: &str, message: String) -> ConfigError {
        ConfigError::InvalidValue {
            syncer: self.name.to_string(),
            key: key.to_string(),
            message,
        }
    }
}

impl SyncerConfig {
    fn from_section(view: &SectionView<'_>) -> Result<Self, ConfigError> {
        let watcher = PathBuf::from(view.require("watcher")?);

        let filter_raw = view.get("filter").unwrap_or(DEFAULT_FILTER);
        let filter = Regex::new(filter_raw)
            .map_err(|e| view.invalid("filter", e.to_string()))?;

        let cron = view
            .get("cron")
            .map(|expr| CronSpec::parse(expr).map_err(|e| view.invalid("cron", e)))
            .transpose()?;

        let handler = match view.require("handler")? {
            "rsync" => HandlerKind::Rsync {
                from: PathBuf::from(view.require("from")?),
                to: PathBuf::from(view.require("to")?),
            },
            "csync2" => {
                let hosts: Vec<String> = view
                    .require("remote_hosts")?
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                if hosts.is_empty() {
                    return Err(view.invalid("remote_hosts", "no hosts listed".to_string()));
                }
                HandlerKind::Csync {
                    prod_dir: PathBuf::from(view.require("prod_dir")?),
                    csync_dir: PathBuf::from(view.require("csync_dir")?),
                    remote_hosts: hosts,
                    group: view
                        .get("csync_group")
                        .unwrap_or(view.name)
                        .to_string(),
                    remote_prefix_command: view
                        .get("remote_prefix_command")
                        .map(str::to_string),
                }
            }
            other => {
                return Err(ConfigError::UnknownHandler {
                    syncer: view.name.to_string(),
                    handler: other.to_string(),
                })
            }
        };

        Ok(Self {
            name: view.name.to_string(),
            watcher,
            filter,
            waiting_time: view.get_secs("waiting_time", DEFAULT_WAITING_TIME)?,
            retry_interval: view.get_secs("retry_interval", DEFAULT_RETRY_INTERVAL)?,
            cron,
            noop_file: view.get("noop_file").map(PathBuf::from),
            admin_from: view.get("admin_from").map(str::to_string),
            admin_to: view.get("admin_to").map(str::to_string),
            handler,
        })
    }

    /// Whether an event path should be dropped by the watcher.
    pub fn is_filtered(&self, path: &Path) -> bool {
        self.filter.is_match(&path.to_string_lossy())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
