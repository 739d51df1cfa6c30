// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution engine
//!
//! This module evaluates parsed plans against a scope and produces lazy row
//! streams, then aligns those rows to the discovered columns.

pub mod context;
pub mod error;
pub mod evaluator;
pub mod materializer;
pub mod plugins;
pub mod row_stream;

// Re-export the main types for convenience
pub use context::{CancelGuard, CancelReason, Context};
pub use error::ExecutionError;
pub use evaluator::Evaluator;
pub use materializer::{MaterializedRow, Materializer};
pub use plugins::{Plugin, PluginArgs, PluginRegistry, DEFAULT_PLUGINS};
pub use row_stream::RowStream;
