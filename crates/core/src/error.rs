// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared by the daemon and the remote helper.

use std::path::PathBuf;

/// Errors raised while loading or validating the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid INI.
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A syncer section is missing a key its handler requires.
    #[error("syncer `{syncer}`: missing required key `{key}`")]
    MissingKey { syncer: String, key: String },

    /// A key is present but its value does not parse.
    #[error("syncer `{syncer}`: invalid value for `{key}`: {message}")]
    InvalidValue {
        syncer: String,
        key: String,
        message: String,
    },

    /// The `handler` key names no known handler kind.
    #[error("syncer `{syncer}`: unknown handler `{handler}`")]
    UnknownHandler { syncer: String, handler: String },

    /// The named syncer does not exist in the configuration.
    #[error("no syncer named `{syncer}` in config")]
    NoSuchSyncer { syncer: String },
}

/// Errors raised by stamp file I/O.
#[derive(Debug, thiserror::Error)]
pub enum StampError {
    #[error("failed to read stamp file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write stamp file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
