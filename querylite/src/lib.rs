// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! QueryLite - query execution and tabular result materialization
//!
//! QueryLite evaluates a small query language against a scope of dynamic
//! values and streams the resulting rows into a sink.
//!
//! # Features
//!
//! - **Lazy evaluation**: rows are produced on demand and may be infinite
//! - **Schema discovery**: columns come from the first row a query produces
//! - **Dynamic values**: any value shape may appear in any cell
//! - **Sinks**: in-memory tables, streaming CSV and JSON lines
//! - **Cancellation**: one context tree stops evaluation and output alike
//! - **Access control**: privileged plugins and functions check the
//!   principal's permissions
//!
//! # Usage
//!
//! ```no_run
//! use querylite::{Config, Context, Dict, QueryCoordinator};
//!
//! let coordinator = QueryCoordinator::new(Config::default().with_user("alice", &["reader"]));
//! let result = coordinator
//!     .run_query(
//!         "SELECT _value AS n FROM range(start=1, end=5) WHERE _value % 2 = 1",
//!         "alice",
//!         Dict::new(),
//!         &Context::background(),
//!     )
//!     .unwrap();
//! assert_eq!(result.row_count(), 3);
//! ```

pub mod acl;
pub mod ast;
pub mod config;
pub mod coordinator;
pub mod exec;
pub mod functions;
pub mod logging;
pub mod plan;
pub mod scope;
pub mod sink;
pub mod types;

// Re-export the public API
pub use acl::{AclError, AclManager, NullAclManager, Permission, ServerAclManager};
pub use ast::ParseError;
pub use config::{Config, ConfigError};
pub use coordinator::{QueryCoordinator, QueryError};
pub use exec::{CancelGuard, Context, ExecutionError, MaterializedRow, Materializer, RowStream};
pub use logging::{init_logging, Component, MemoryLogger, PlainLogger, QueryLogger};
pub use plan::QueryPlan;
pub use scope::{Scope, ScopeBuilder};
pub use sink::{
    drain, CsvSink, DrainStats, JsonSink, RowSink, SinkError, TableResult, TableRow, TableSink,
};
pub use types::{any_to_string, Associative, Dict, Value};

/// QueryLite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// QueryLite crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
