// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query Coordinator - entry points for running a query into a sink
//!
//! Every call builds a fresh scope for the requesting principal, parses the
//! query, derives a cancellation context from the caller's, and drains the
//! materialized rows into one sink. The scope is closed on every exit path.

use super::QueryError;
use crate::config::Config;
use crate::exec::context::{CancelGuard, Context};
use crate::exec::materializer::Materializer;
use crate::logging::{Component, PlainLogger, QueryLogger};
use crate::plan::QueryPlan;
use crate::scope::ScopeBuilder;
use crate::sink::{drain, CsvSink, DrainStats, JsonSink, RowSink, TableResult, TableSink};
use crate::types::Dict;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Query Coordinator - runs queries on behalf of principals
///
/// The coordinator holds only configuration and the logger handed to each
/// scope; it is cheap to share and can serve concurrent calls.
pub struct QueryCoordinator {
    config: Arc<Config>,
    logger: Arc<dyn QueryLogger>,
}

impl QueryCoordinator {
    /// Create a coordinator logging through the `log` facade
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            logger: Arc::new(PlainLogger::new(Component::Api)),
        }
    }

    /// Create a coordinator from a JSON configuration file
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        Ok(Self::new(Config::from_file(path)?))
    }

    /// Replace the logger attached to every scope this coordinator builds
    pub fn with_logger(mut self, logger: Arc<dyn QueryLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a query and collect the whole result in memory
    ///
    /// # Arguments
    /// * `query` - Query text
    /// * `principal` - Principal whose permissions apply
    /// * `env` - Bindings visible to the query
    /// * `ctx` - Caller's context; cancelling it stops the query
    ///
    /// # Returns
    /// * `Ok(TableResult)` - All rows, or the rows seen before cancellation
    ///   with `cancelled` set
    /// * `Err(QueryError)` - Parse, authorization or evaluation failure; rows
    ///   collected before an evaluation error are discarded
    pub fn run_query(
        &self,
        query: &str,
        principal: &str,
        env: Dict,
        ctx: &Context,
    ) -> Result<TableResult, QueryError> {
        let started = Instant::now();
        let mut sink = TableSink::new();
        let stats = self.execute(query, principal, env, ctx, &mut sink)?;

        sink.set_cancelled(stats.cancelled);
        sink.set_execution_time_ms(started.elapsed().as_millis() as u64);
        Ok(sink.into_result())
    }

    /// Run a query, streaming rows as CSV into `output`
    ///
    /// Delimiter and header line follow the `csv` configuration section.
    /// Rows already written stay written if the query fails; the output is
    /// flushed before any error is returned.
    pub fn store_query_as_csv<W: Write>(
        &self,
        query: &str,
        principal: &str,
        env: Dict,
        ctx: &Context,
        output: W,
    ) -> Result<DrainStats, QueryError> {
        let mut sink = CsvSink::from_config(output, &self.config.csv)?;
        self.execute(query, principal, env, ctx, &mut sink)
    }

    /// Run a query, streaming one JSON object per line into `output`
    ///
    /// Rows that cannot be represented in JSON are skipped with a warning and
    /// counted in `DrainStats::skipped_rows`.
    pub fn store_query_as_json<W: Write>(
        &self,
        query: &str,
        principal: &str,
        env: Dict,
        ctx: &Context,
        output: W,
    ) -> Result<DrainStats, QueryError> {
        let mut sink = JsonSink::new(output, self.logger.clone());
        let mut stats = self.execute(query, principal, env, ctx, &mut sink)?;
        stats.skipped_rows = sink.skipped_rows();
        if stats.skipped_rows > 0 {
            self.logger.info(&format!(
                "Skipped {} row(s) that could not be written as JSON",
                stats.skipped_rows
            ));
        }
        Ok(stats)
    }

    fn execute<S: RowSink + ?Sized>(
        &self,
        query: &str,
        principal: &str,
        env: Dict,
        parent: &Context,
        sink: &mut S,
    ) -> Result<DrainStats, QueryError> {
        let scope =
            ScopeBuilder::for_principal(self.config.clone(), principal, env, self.logger.clone())?
                .build();

        let plan = match QueryPlan::parse(query) {
            Ok(plan) => plan,
            Err(e) => {
                scope.logger().debug(&format!("Query rejected: {}", e));
                scope.close();
                return Err(e.into());
            }
        };

        let (ctx, guard) = self.derive_context(parent);
        scope.logger().debug(&format!(
            "Running query for {} in scope {}",
            principal,
            scope.id()
        ));
        let drained = drain(Materializer::new(&plan, &scope, &ctx), sink, &ctx);

        // guard stays live until the sink is closed
        let closed = sink.close();
        drop(guard);
        scope.close();

        let stats = drained?;
        closed?;
        scope.logger().debug(&format!(
            "Query finished with {} row(s){}",
            stats.rows,
            if stats.cancelled { " (cancelled)" } else { "" }
        ));
        Ok(stats)
    }

    fn derive_context(&self, parent: &Context) -> (Context, CancelGuard) {
        match self.config.limits.query_timeout() {
            Some(timeout) => parent.with_timeout(timeout),
            None => parent.with_cancel(),
        }
    }
}

impl Default for QueryCoordinator {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
