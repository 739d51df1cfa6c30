// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Runtime configuration
//!
//! Configuration is plain serde data with defaults for every field, so a
//! partial JSON document (or none at all) yields a usable `Config`.

use crate::acl::Permission;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Principals, roles and permissions
    pub acl: AclConfig,

    /// Log output settings
    pub logging: LoggingConfig,

    /// Delimited output settings
    pub csv: CsvConfig,

    /// Per-query resource limits
    pub limits: QueryLimits,
}

/// Access control configuration
///
/// `users` maps a principal name to its role names. Roles not listed under
/// `roles` fall back to the built-in role definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    pub users: HashMap<String, Vec<String>>,
    pub roles: HashMap<String, Vec<Permission>>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// env_logger filter directive, e.g. "info" or "querylite=debug"
    pub level: String,

    /// Include timestamps in log lines
    pub timestamps: bool,
}

/// CSV writer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Field delimiter, must be a single ASCII character
    pub delimiter: char,

    /// Emit a header line with the discovered column names
    pub write_headers: bool,
}

/// Query resource limits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// Cancel evaluation after this many milliseconds
    pub query_timeout_ms: Option<u64>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            timestamps: true,
        }
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            write_headers: true,
        }
    }
}

impl CsvConfig {
    /// Delimiter as the single byte the CSV writer expects
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ConfigError::InvalidValue {
                field: "csv.delimiter".to_string(),
                message: format!("'{}' is not an ASCII character", self.delimiter),
            })
        }
    }
}

impl QueryLimits {
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    /// Parse configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loading configuration from {}", path.as_ref().display());
        Self::from_json_str(&contents)
    }

    /// Check values serde cannot express constraints for
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.csv.delimiter_byte()?;
        if self.limits.query_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "limits.query_timeout_ms".to_string(),
                message: "timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Builder-style helper to assign roles to a principal
    pub fn with_user(mut self, principal: &str, roles: &[&str]) -> Self {
        self.acl.users.insert(
            principal.to_string(),
            roles.iter().map(|r| r.to_string()).collect(),
        );
        self
    }
}
