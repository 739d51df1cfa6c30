// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row materializer
//!
//! Turns the lazy row stream of a plan into rows of cells aligned to one
//! column list. The column list is discovered from the first row only;
//! later rows are read through it, so extra members are dropped and missing
//! ones become empty strings.

use crate::exec::context::Context;
use crate::exec::error::ExecutionError;
use crate::exec::row_stream::RowStream;
use crate::plan::QueryPlan;
use crate::scope::Scope;
use crate::types::Value;
use std::sync::Arc;

/// One row with its cells in column order
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedRow {
    /// Columns discovered from the first row, shared by every row
    pub columns: Arc<[String]>,
    /// One cell per column
    pub cells: Vec<Value>,
    /// The row as produced by evaluation
    pub row: Value,
}

/// Iterator of materialized rows
pub struct Materializer<'a> {
    rows: RowStream<'a>,
    scope: &'a Scope,
    ctx: Context,
    columns: Option<Arc<[String]>>,
    done: bool,
}

impl<'a> Materializer<'a> {
    /// Start evaluating `plan` in `scope`
    pub fn new(plan: &QueryPlan, scope: &'a Scope, ctx: &Context) -> Self {
        Self::from_rows(plan.evaluate(ctx, scope), scope, ctx)
    }

    /// Materialize an already opened row stream
    pub fn from_rows(rows: RowStream<'a>, scope: &'a Scope, ctx: &Context) -> Self {
        Self {
            rows,
            scope,
            ctx: ctx.clone(),
            columns: None,
            done: false,
        }
    }

    /// Columns, once the first row has been seen
    pub fn columns(&self) -> Option<&Arc<[String]>> {
        self.columns.as_ref()
    }
}

impl Iterator for Materializer<'_> {
    type Item = Result<MaterializedRow, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.ctx.is_cancelled() {
            self.done = true;
            return None;
        }

        let row = match self.rows.next() {
            None => {
                self.done = true;
                return None;
            }
            Some(Err(e)) => {
                self.done = true;
                return Some(Err(e));
            }
            Some(Ok(row)) => row,
        };

        let scope = self.scope;
        let columns = self
            .columns
            .get_or_insert_with(|| {
                let members = scope.get_members(&row);
                log::debug!("Discovered {} column(s): {:?}", members.len(), members);
                members.into()
            })
            .clone();

        let cells = columns
            .iter()
            .map(|column| {
                scope
                    .associative(&row, column)
                    .unwrap_or_else(|| Value::String(String::new()))
            })
            .collect();

        Some(Ok(MaterializedRow {
            columns,
            cells,
            row,
        }))
    }
}
