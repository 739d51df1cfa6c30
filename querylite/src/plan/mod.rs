// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query plans
//!
//! A `QueryPlan` is the parsed, immutable form of a query. Parsing never
//! consults a scope; the same plan can be evaluated many times against
//! different scopes.

use crate::ast::{parse_query, ParseError, Statement};
use crate::exec::context::Context;
use crate::exec::evaluator::Evaluator;
use crate::exec::row_stream::{PlanStream, RowStream};
use crate::scope::Scope;
use std::fmt;
use std::sync::Arc;

/// Parsed query, cheap to clone
#[derive(Clone)]
pub struct QueryPlan {
    text: Arc<str>,
    statements: Arc<[Statement]>,
}

impl QueryPlan {
    /// Parse query text
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let query = parse_query(text)?;
        Ok(Self {
            text: Arc::from(text),
            statements: query.statements.into(),
        })
    }

    /// Source text the plan was parsed from
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Lazily evaluate every statement in `scope`
    ///
    /// Rows of successive SELECT statements are concatenated. The stream
    /// ends early when `ctx` is cancelled.
    pub fn evaluate<'a>(&self, ctx: &Context, scope: &'a Scope) -> RowStream<'a> {
        log::debug!(
            "Evaluating {} statement(s) in scope {}",
            self.statements.len(),
            scope.id()
        );
        Box::new(PlanStream::new(
            self.statements.clone(),
            Evaluator::new(scope, ctx),
        ))
    }
}

impl fmt::Debug for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryPlan")
            .field("text", &self.text)
            .field("statements", &self.statements.len())
            .finish()
    }
}
