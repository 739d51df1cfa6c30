// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Component-tagged logging
//!
//! Loggers are injected into each `Scope` rather than looked up globally.
//! `PlainLogger` forwards to the `log` facade with a per-component target;
//! `MemoryLogger` keeps lines in memory for callers that need to inspect
//! what a query reported.

use crate::config::LoggingConfig;
use log::Level;
use parking_lot::Mutex;

/// Subsystem a log line originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Standalone tooling and tests
    Tool,
    /// Query entry points
    Api,
    /// Query evaluation
    Vql,
}

impl Component {
    /// `log` target used for this component
    pub fn target(&self) -> &'static str {
        match self {
            Component::Tool => "querylite::tool",
            Component::Api => "querylite::api",
            Component::Vql => "querylite::vql",
        }
    }
}

/// Logger attached to a scope
pub trait QueryLogger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Logger forwarding to the `log` facade
#[derive(Debug, Clone)]
pub struct PlainLogger {
    component: Component,
}

impl PlainLogger {
    pub fn new(component: Component) -> Self {
        Self { component }
    }

    pub fn component(&self) -> Component {
        self.component
    }
}

impl QueryLogger for PlainLogger {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: self.component.target(), level, "{}", message);
    }
}

/// Logger that records every line in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded lines
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().clone()
    }

    /// Recorded lines at `level`
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl QueryLogger for MemoryLogger {
    fn log(&self, level: Level, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

/// Initialize env_logger from configuration
///
/// `RUST_LOG` still takes precedence over the configured level. Calling this
/// more than once is harmless; only the first call installs a logger.
pub fn init_logging(config: &LoggingConfig) {
    let env = env_logger::Env::default().default_filter_or(config.level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    if !config.timestamps {
        builder.format_timestamp(None);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
