// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the database file | `./data` |
//! | `DB_FILE` | Database file name inside `DATA_DIR` | `records.redb` |
//! | `STORE_SECRET` | Password used to encrypt item payloads | Required |
//! | `WALLET_RPC_URL` | Ledger wallet JSON-RPC base URL | `http://127.0.0.1:10103` |
//! | `WALLET_RPC_USER` | Wallet RPC basic auth user | Unset |
//! | `WALLET_RPC_PASSWORD` | Wallet RPC basic auth password | Unset |
//! | `RECONCILE_INTERVAL_SECS` | Seconds between reconciler cycles | `5` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ErrorKind;
use crate::ledger::client::RpcCredentials;

/// Environment variable name for the data directory.
///
/// Created on startup if it does not exist.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Environment variable name for the database file name.
pub const DB_FILE_ENV: &str = "DB_FILE";

pub const DEFAULT_DB_FILE: &str = "records.redb";

/// Environment variable name for the store secret.
///
/// Item payloads written with one secret read back as garbage under
/// another, so this must stay stable for the lifetime of a database file.
pub const STORE_SECRET_ENV: &str = "STORE_SECRET";

/// Environment variable name for the wallet RPC base URL.
///
/// Requests go to `{WALLET_RPC_URL}/json_rpc`.
pub const WALLET_RPC_URL_ENV: &str = "WALLET_RPC_URL";

pub const DEFAULT_WALLET_RPC_URL: &str = "http://127.0.0.1:10103";

pub const WALLET_RPC_USER_ENV: &str = "WALLET_RPC_USER";
pub const WALLET_RPC_PASSWORD_ENV: &str = "WALLET_RPC_PASSWORD";

/// Environment variable name for the reconciler tick in whole seconds.
pub const RECONCILE_INTERVAL_ENV: &str = "RECONCILE_INTERVAL_SECS";

pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 5;

/// Environment variable name for the log output format.
///
/// # Values
/// - `json`: one JSON object per line
/// - `pretty`: human readable (default)
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Invalid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                reason: format!("expected `json` or `pretty`, got `{other}`"),
            }),
        }
    }
}

/// Process configuration resolved from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_file: String,
    pub store_secret: String,
    pub wallet_rpc_url: String,
    pub wallet_rpc_user: Option<String>,
    pub wallet_rpc_password: Option<String>,
    pub reconcile_interval: Duration,
    pub log_format: LogFormat,
}

// Keep secrets out of logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("data_dir", &self.data_dir)
            .field("db_file", &self.db_file)
            .field("store_secret", &"<redacted>")
            .field("wallet_rpc_url", &self.wallet_rpc_url)
            .field("wallet_rpc_user", &self.wallet_rpc_user)
            .field(
                "wallet_rpc_password",
                &self.wallet_rpc_password.as_ref().map(|_| "<redacted>"),
            )
            .field("reconcile_interval", &self.reconcile_interval)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store_secret = get(STORE_SECRET_ENV).ok_or(ConfigError::Missing(STORE_SECRET_ENV))?;

        let db_file = get(DB_FILE_ENV).unwrap_or_else(|| DEFAULT_DB_FILE.to_string());
        if db_file.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                name: DB_FILE_ENV,
                reason: "must be a file name, not a path".to_string(),
            });
        }

        let interval_secs = match get(RECONCILE_INTERVAL_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: RECONCILE_INTERVAL_ENV,
                    reason: format!("expected a positive integer, got `{raw}`"),
                })?,
            None => DEFAULT_RECONCILE_INTERVAL_SECS,
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(raw) => LogFormat::parse(&raw)?,
            None => LogFormat::default(),
        };

        Ok(Self {
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            db_file,
            store_secret,
            wallet_rpc_url: get(WALLET_RPC_URL_ENV)
                .unwrap_or_else(|| DEFAULT_WALLET_RPC_URL.to_string()),
            wallet_rpc_user: get(WALLET_RPC_USER_ENV),
            wallet_rpc_password: get(WALLET_RPC_PASSWORD_ENV),
            reconcile_interval: Duration::from_secs(interval_secs),
            log_format,
        })
    }

    /// Full path of the database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    /// Basic auth credentials, present only when a user is configured.
    ///
    /// A missing password is sent as empty.
    pub fn wallet_credentials(&self) -> Option<RpcCredentials> {
        self.wallet_rpc_user.as_ref().map(|username| RpcCredentials {
            username: username.clone(),
            password: self.wallet_rpc_password.clone().unwrap_or_default(),
        })
    }
}
