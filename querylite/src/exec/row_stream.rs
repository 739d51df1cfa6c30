// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lazy row streams
//!
//! Rows are produced one at a time on `next()`. Every stream checks its
//! cancellation context before producing a row and simply ends once the
//! context is cancelled; dropping a stream at any point is valid.

use crate::ast::{LetValue, SelectItem, SelectStatement, Statement};
use crate::exec::context::Context;
use crate::exec::error::ExecutionError;
use crate::exec::evaluator::{Evaluator, LetBinding};
use crate::logging::Component;
use crate::types::{Dict, Value};
use std::sync::Arc;

/// Lazy, possibly infinite sequence of rows
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Value, ExecutionError>> + 'a>;

/// Ends the wrapped iterator once the context is cancelled
pub struct Cancellable<I> {
    inner: I,
    ctx: Context,
}

impl<I> Cancellable<I> {
    pub fn new(inner: I, ctx: &Context) -> Self {
        Self {
            inner,
            ctx: ctx.clone(),
        }
    }
}

impl<I: Iterator> Iterator for Cancellable<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ctx.is_cancelled() {
            return None;
        }
        self.inner.next()
    }
}

/// Rows of a bound value: arrays yield their elements, a dict yields itself
///
/// Array elements that are not dicts are wrapped as `{ "_value": element }`.
pub fn value_rows<'a>(
    name: &str,
    value: Value,
    ctx: &Context,
) -> Result<RowStream<'a>, ExecutionError> {
    match value {
        Value::Array(items) => {
            let rows = items.into_iter().map(|item| match item {
                Value::Dict(_) => Ok(item),
                other => Ok(Value::Dict(Dict::new().set("_value", other))),
            });
            Ok(Box::new(Cancellable::new(rows, ctx)))
        }
        Value::Dict(_) => Ok(Box::new(Cancellable::new(std::iter::once(Ok(value)), ctx))),
        Value::Null => Err(ExecutionError::UnknownSource(name.to_string())),
        other => Err(ExecutionError::UnknownSource(format!(
            "{} (a {} is not a row source)",
            name,
            other.type_name()
        ))),
    }
}

/// One SELECT: filter, project and limit the rows of its source
pub struct SelectStream<'a> {
    evaluator: Evaluator<'a>,
    select: Arc<SelectStatement>,
    source: RowStream<'a>,
    emitted: usize,
    done: bool,
}

impl<'a> SelectStream<'a> {
    pub fn new(evaluator: Evaluator<'a>, select: Arc<SelectStatement>, source: RowStream<'a>) -> Self {
        Self {
            evaluator,
            select,
            source,
            emitted: 0,
            done: false,
        }
    }

    fn project(&self, row: &Value) -> Result<Value, ExecutionError> {
        let scope = self.evaluator.scope();
        let mut output = Dict::with_capacity(self.select.items.len());
        for item in &self.select.items {
            match item {
                SelectItem::Wildcard => {
                    for member in scope.get_members(row) {
                        let value = scope.associative(row, &member).unwrap_or(Value::Null);
                        output.insert(member, value);
                    }
                }
                SelectItem::Expression { expression, .. } => {
                    let name = item.column_name().unwrap_or_default();
                    output.insert(name, self.evaluator.eval(expression, Some(row))?);
                }
            }
        }
        Ok(Value::Dict(output))
    }

    fn fail(&mut self, error: ExecutionError) -> Option<Result<Value, ExecutionError>> {
        self.done = true;
        Some(Err(error))
    }
}

impl Iterator for SelectStream<'_> {
    type Item = Result<Value, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.select.limit.is_some_and(|limit| self.emitted >= limit) {
            self.done = true;
            return None;
        }

        loop {
            if self.evaluator.context().is_cancelled() {
                self.done = true;
                return None;
            }
            let row = match self.source.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => return self.fail(e),
                Some(Ok(row)) => row,
            };

            if let Some(condition) = &self.select.where_clause {
                match self.evaluator.eval(condition, Some(&row)) {
                    Ok(value) if value.is_truthy() => {}
                    Ok(_) => continue,
                    Err(e) => return self.fail(e),
                }
            }

            return match self.project(&row) {
                Ok(projected) => {
                    self.emitted += 1;
                    Some(Ok(projected))
                }
                Err(e) => self.fail(e),
            };
        }
    }
}

/// All statements of a query: LETs bind, SELECT rows are concatenated in order
pub struct PlanStream<'a> {
    statements: Arc<[Statement]>,
    next_statement: usize,
    evaluator: Evaluator<'a>,
    current: Option<RowStream<'a>>,
}

impl<'a> PlanStream<'a> {
    pub fn new(statements: Arc<[Statement]>, evaluator: Evaluator<'a>) -> Self {
        Self {
            statements,
            next_statement: 0,
            evaluator,
            current: None,
        }
    }
}

impl Iterator for PlanStream<'_> {
    type Item = Result<Value, ExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(Err(e)) => {
                        self.current = None;
                        self.next_statement = self.statements.len();
                        return Some(Err(e));
                    }
                    Some(row) => return Some(row),
                    None => self.current = None,
                }
            }

            if self.evaluator.context().is_cancelled() {
                return None;
            }
            let statement = self.statements.get(self.next_statement)?.clone();
            self.next_statement += 1;

            match statement {
                Statement::Let(let_statement) => {
                    log::debug!(
                        target: Component::Vql.target(),
                        "Binding LET {}",
                        let_statement.name
                    );
                    self.evaluator
                        .bind(&let_statement.name, |defined_in| match let_statement.value {
                            LetValue::Query(select) => LetBinding::Query { select, defined_in },
                            LetValue::Expression(expression) => LetBinding::Expression {
                                expression,
                                defined_in,
                            },
                        });
                }
                Statement::Select(select) => match self.evaluator.select(select) {
                    Ok(rows) => self.current = Some(rows),
                    Err(e) => {
                        self.next_statement = self.statements.len();
                        return Some(Err(e));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::NullAclManager;
    use crate::config::Config;
    use crate::scope::ScopeBuilder;

    #[test]
    fn test_value_rows_wraps_scalars() {
        let ctx = Context::background();
        let bound = Value::from(vec![Value::Int(1), Value::Dict(Dict::new().set("a", 2))]);
        let rows: Vec<Value> = value_rows("x", bound, &ctx)
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(rows[0], Value::Dict(Dict::new().set("_value", 1)));
        assert_eq!(rows[1], Value::Dict(Dict::new().set("a", 2)));
    }

    #[test]
    fn test_value_rows_rejects_null_and_scalars() {
        let ctx = Context::background();
        assert!(matches!(
            value_rows("x", Value::Null, &ctx),
            Err(ExecutionError::UnknownSource(_))
        ));
        assert!(value_rows("x", Value::Int(1), &ctx).is_err());
    }

    #[test]
    fn test_cancellable_stops() {
        let (ctx, guard) = Context::background().with_cancel();
        let mut rows = Cancellable::new(0.., &ctx);
        assert_eq!(rows.next(), Some(0));
        guard.cancel();
        assert_eq!(rows.next(), None);
    }

    #[test]
    fn test_plan_stream_concatenates_selects() {
        let scope = ScopeBuilder::new(Arc::new(Config::default()), Arc::new(NullAclManager)).build();
        let query = crate::ast::parse_query(
            "LET two = SELECT _value FROM range(start=1, end=2) SELECT * FROM two SELECT _value * 10 AS x FROM two",
        )
        .unwrap();
        let evaluator = Evaluator::new(&scope, &Context::background());
        let stream = PlanStream::new(query.statements.into(), evaluator);
        let rows: Vec<Value> = stream.map(Result::unwrap).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], Value::Dict(Dict::new().set("x", 20)));
    }
}
