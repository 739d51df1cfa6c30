// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query Coordinator - Central orchestration for query execution
//!
//! The QueryCoordinator provides the entry points that tie parsing, scope
//! construction, cancellation, materialization and sinks together.

pub mod query_coordinator;

pub use query_coordinator::QueryCoordinator;

use crate::acl::AclError;
use crate::ast::ParseError;
use crate::config::ConfigError;
use crate::exec::error::ExecutionError;
use crate::sink::SinkError;
use thiserror::Error;

/// Any failure of a coordinated query
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Access control error: {0}")]
    Acl(#[from] AclError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Output error: {0}")]
    Sink(#[from] SinkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
