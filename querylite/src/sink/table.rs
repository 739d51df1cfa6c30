// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory table sink

use super::{RowSink, SinkError};
use crate::exec::materializer::MaterializedRow;
use crate::types::any_to_string;
use serde::{Deserialize, Serialize};

/// One row of display strings, aligned to `TableResult::columns`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<String>,
}

/// Complete tabular result of a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableResult {
    /// Columns discovered from the first row, empty for zero rows
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
    /// Rows stopped arriving because the query was cancelled
    pub cancelled: bool,
    /// Wall time spent evaluating and collecting
    pub execution_time_ms: u64,
}

impl TableResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row`, `column`
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows
            .get(row)
            .and_then(|r| r.cells.get(index))
            .map(String::as_str)
    }
}

/// Collects rows into a `TableResult`
#[derive(Debug, Default)]
pub struct TableSink {
    result: TableResult,
}

impl TableSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows collected so far
    pub fn rows(&self) -> &[TableRow] {
        &self.result.rows
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.result.cancelled = cancelled;
    }

    pub fn set_execution_time_ms(&mut self, millis: u64) {
        self.result.execution_time_ms = millis;
    }

    pub fn into_result(self) -> TableResult {
        self.result
    }
}

impl RowSink for TableSink {
    fn write_row(&mut self, row: &MaterializedRow) -> Result<(), SinkError> {
        if self.result.columns.is_empty() && !row.columns.is_empty() {
            self.result.columns = row.columns.to_vec();
        }
        self.result.rows.push(TableRow {
            cells: row.cells.iter().map(any_to_string).collect(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
