//! Test fixture for QueryLite integration tests
//!
//! Wraps a `QueryCoordinator` configured with one principal per built-in
//! role, a set of bindings passed to every query, and a temporary directory
//! for file-backed tests.

use querylite::{
    Config, Context, Dict, DrainStats, MemoryLogger, QueryCoordinator, QueryError, TableResult,
    Value,
};
use std::path::PathBuf;
use std::sync::Arc;

pub const ADMIN: &str = "admin";
pub const INVESTIGATOR: &str = "investigator";
pub const ANALYST: &str = "analyst";
pub const READER: &str = "reader";

/// Coordinator plus bindings and a scratch directory
pub struct TestFixture {
    coordinator: QueryCoordinator,
    logger: Arc<MemoryLogger>,
    env: Dict,
    temp_dir: tempfile::TempDir,
}

impl TestFixture {
    /// Fixture with the default configuration
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_config(Config::default())
    }

    /// Fixture whose queries are cancelled after `millis`
    pub fn with_timeout(millis: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Config::default();
        config.limits.query_timeout_ms = Some(millis);
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let config = config
            .with_user(ADMIN, &["administrator"])
            .with_user(INVESTIGATOR, &["investigator"])
            .with_user(ANALYST, &["analyst"])
            .with_user(READER, &["reader"]);
        config.validate()?;

        let logger = Arc::new(MemoryLogger::new());
        let coordinator = QueryCoordinator::new(config).with_logger(logger.clone());

        Ok(TestFixture {
            coordinator,
            logger,
            env: Dict::new(),
            temp_dir: tempfile::tempdir()?,
        })
    }

    /// Add a binding visible to every query
    pub fn bind(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.env.insert(name, value);
        self
    }

    /// Bind `name` to rows `{ "Id": i, "Name": "row i" }` for i in 1..=count
    pub fn bind_rows(&mut self, name: &str, count: i64) -> &mut Self {
        let rows: Vec<Value> = (1..=count)
            .map(|i| Value::Dict(Dict::new().set("Id", i).set("Name", format!("row {}", i))))
            .collect();
        self.bind(name, rows)
    }

    pub fn coordinator(&self) -> &QueryCoordinator {
        &self.coordinator
    }

    pub fn logger(&self) -> &MemoryLogger {
        &self.logger
    }

    pub fn env(&self) -> Dict {
        self.env.clone()
    }

    /// Run as the administrator
    pub fn query(&self, query: &str) -> Result<TableResult, QueryError> {
        self.query_as(ADMIN, query)
    }

    pub fn query_as(&self, principal: &str, query: &str) -> Result<TableResult, QueryError> {
        self.coordinator
            .run_query(query, principal, self.env(), &Context::background())
    }

    /// Run as the administrator, returning the CSV text
    pub fn csv(&self, query: &str) -> Result<(String, DrainStats), QueryError> {
        let mut output = Vec::new();
        let stats = self.coordinator.store_query_as_csv(
            query,
            ADMIN,
            self.env(),
            &Context::background(),
            &mut output,
        )?;
        Ok((into_text(output), stats))
    }

    /// Run as the administrator, returning the JSON lines text
    pub fn json(&self, query: &str) -> Result<(String, DrainStats), QueryError> {
        let mut output = Vec::new();
        let stats = self.coordinator.store_query_as_json(
            query,
            ADMIN,
            self.env(),
            &Context::background(),
            &mut output,
        )?;
        Ok((into_text(output), stats))
    }

    /// Write `contents` to a file in the fixture directory
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write test file");
        path
    }
}

pub fn into_text(output: Vec<u8>) -> String {
    String::from_utf8(output).expect("Output is not UTF-8")
}

/// Cells of a table result, row by row
pub fn cells(result: &TableResult) -> Vec<Vec<String>> {
    result.rows.iter().map(|row| row.cells.clone()).collect()
}
