// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Expression evaluation
//!
//! An `Evaluator` pairs a scope and a cancellation context with the LET
//! bindings visible at one point of a query. LET bindings capture the
//! bindings defined before them, so a binding can never refer to itself.

use crate::ast::{Expression, Literal, Operator, SelectStatement, Source};
use crate::exec::context::Context;
use crate::exec::error::ExecutionError;
use crate::exec::plugins::DEFAULT_PLUGINS;
use crate::exec::row_stream::{value_rows, RowStream, SelectStream};
use crate::functions::DEFAULT_REGISTRY;
use crate::logging::Component;
use crate::scope::Scope;
use crate::types::{any_to_string, Dict, Value};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// LET bindings visible to a statement
pub type LetBindings = HashMap<String, LetBinding>;

/// A LET binding and the bindings that were visible where it was defined
#[derive(Debug, Clone)]
pub enum LetBinding {
    Query {
        select: Arc<SelectStatement>,
        defined_in: Arc<LetBindings>,
    },
    Expression {
        expression: Expression,
        defined_in: Arc<LetBindings>,
    },
}

type RegexCache = Arc<Mutex<HashMap<String, Regex>>>;

/// Evaluates expressions and opens row sources against one scope
#[derive(Clone)]
pub struct Evaluator<'a> {
    scope: &'a Scope,
    ctx: Context,
    lets: Arc<LetBindings>,
    regexes: RegexCache,
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: &'a Scope, ctx: &Context) -> Self {
        Self {
            scope,
            ctx: ctx.clone(),
            lets: Arc::new(LetBindings::new()),
            regexes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn scope(&self) -> &'a Scope {
        self.scope
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn lets(&self) -> &Arc<LetBindings> {
        &self.lets
    }

    /// Same scope and context, different LET bindings
    pub fn with_lets(&self, lets: Arc<LetBindings>) -> Self {
        Self {
            scope: self.scope,
            ctx: self.ctx.clone(),
            lets,
            regexes: self.regexes.clone(),
        }
    }

    /// Add a LET binding, capturing the bindings defined so far
    pub fn bind(&mut self, name: &str, binding: impl FnOnce(Arc<LetBindings>) -> LetBinding) {
        let defined_in = self.lets.clone();
        Arc::make_mut(&mut self.lets).insert(name.to_string(), binding(defined_in));
    }

    // ==============================================================================
    // ROW SOURCES
    // ==============================================================================

    /// Lazily evaluate a SELECT
    pub fn select(&self, select: Arc<SelectStatement>) -> Result<RowStream<'a>, ExecutionError> {
        let source = self.open_source(&select.source)?;
        Ok(Box::new(SelectStream::new(self.clone(), select, source)))
    }

    fn open_source(&self, source: &Source) -> Result<RowStream<'a>, ExecutionError> {
        match source {
            Source::Plugin { name, args } => {
                let arguments = args
                    .iter()
                    .map(|arg| {
                        self.eval(&arg.value, None)
                            .map(|value| (arg.name.clone(), value))
                    })
                    .collect::<Result<Dict, ExecutionError>>()?;
                DEFAULT_PLUGINS.call(name, arguments, &self.ctx, self.scope)
            }
            Source::Binding(name) => match self.lets.get(name) {
                Some(LetBinding::Query { select, defined_in }) => {
                    self.with_lets(defined_in.clone()).select(select.clone())
                }
                Some(LetBinding::Expression {
                    expression,
                    defined_in,
                }) => {
                    let value = self.with_lets(defined_in.clone()).eval(expression, None)?;
                    value_rows(name, value, &self.ctx)
                }
                None => match self.scope.resolve(name) {
                    Some(value) => value_rows(name, value, &self.ctx),
                    None => Err(ExecutionError::UnknownSource(name.clone())),
                },
            },
        }
    }

    // ==============================================================================
    // EXPRESSIONS
    // ==============================================================================

    /// Evaluate `expression`, resolving bare identifiers against `row` first
    pub fn eval(&self, expression: &Expression, row: Option<&Value>) -> Result<Value, ExecutionError> {
        match expression {
            Expression::Literal(literal) => Ok(literal_value(literal)),
            Expression::Identifier(name) => self.resolve_symbol(name, row),
            Expression::PropertyAccess { object, member } => {
                let object = self.eval(object, row)?;
                Ok(self.scope.associative(&object, member).unwrap_or(Value::Null))
            }
            Expression::FunctionCall { name, args } => {
                let arguments = args
                    .iter()
                    .map(|arg| {
                        self.eval(&arg.value, row)
                            .map(|value| (arg.name.clone(), value))
                    })
                    .collect::<Result<Dict, ExecutionError>>()?;
                DEFAULT_REGISTRY.call(name, arguments, self.scope)
            }
            Expression::Binary {
                left,
                operator: Operator::And,
                right,
            } => Ok(Value::Bool(
                self.eval(left, row)?.is_truthy() && self.eval(right, row)?.is_truthy(),
            )),
            Expression::Binary {
                left,
                operator: Operator::Or,
                right,
            } => Ok(Value::Bool(
                self.eval(left, row)?.is_truthy() || self.eval(right, row)?.is_truthy(),
            )),
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.eval(left, row)?;
                let right = self.eval(right, row)?;
                self.binary(*operator, left, right)
            }
            Expression::Unary {
                operator,
                expression,
            } => {
                let value = self.eval(expression, row)?;
                unary(*operator, value)
            }
            Expression::List(items) => items
                .iter()
                .map(|item| self.eval(item, row))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    /// Row member, then LET binding, then scope binding; otherwise NULL
    fn resolve_symbol(&self, name: &str, row: Option<&Value>) -> Result<Value, ExecutionError> {
        if let Some(value) = row.and_then(|row| self.scope.associative(row, name)) {
            return Ok(value);
        }
        match self.lets.get(name) {
            Some(LetBinding::Expression {
                expression,
                defined_in,
            }) => return self.with_lets(defined_in.clone()).eval(expression, None),
            Some(LetBinding::Query { select, defined_in }) => {
                let rows = self.with_lets(defined_in.clone()).select(select.clone())?;
                return rows.collect::<Result<Vec<_>, _>>().map(Value::Array);
            }
            None => {}
        }
        if let Some(value) = self.scope.resolve(name) {
            return Ok(value);
        }
        log::debug!(
            target: Component::Vql.target(),
            "Symbol '{}' not found, using NULL",
            name
        );
        Ok(Value::Null)
    }

    fn binary(&self, operator: Operator, left: Value, right: Value) -> Result<Value, ExecutionError> {
        use std::cmp::Ordering;

        let ordered = |accept: fn(Ordering) -> bool| {
            Value::Bool(left.compare(&right).map_or(false, accept))
        };
        match operator {
            Operator::Equal => Ok(Value::Bool(left.loose_eq(&right))),
            Operator::NotEqual => Ok(Value::Bool(!left.loose_eq(&right))),
            Operator::LessThan => Ok(ordered(|o| o == Ordering::Less)),
            Operator::LessEqual => Ok(ordered(|o| o != Ordering::Greater)),
            Operator::GreaterThan => Ok(ordered(|o| o == Ordering::Greater)),
            Operator::GreaterEqual => Ok(ordered(|o| o != Ordering::Less)),
            Operator::RegexMatch => self.regex_match(&left, &right),
            Operator::Plus
            | Operator::Minus
            | Operator::Multiply
            | Operator::Divide
            | Operator::Modulo => arithmetic(operator, left, right),
            Operator::And | Operator::Or | Operator::Not => Err(ExecutionError::ExpressionError(
                format!("{} is not a binary operator here", operator),
            )),
        }
    }

    fn regex_match(&self, subject: &Value, pattern: &Value) -> Result<Value, ExecutionError> {
        if subject.is_null() {
            return Ok(Value::Bool(false));
        }
        let pattern = any_to_string(pattern);
        let mut cache = self.regexes.lock();
        if !cache.contains_key(&pattern) {
            let regex = Regex::new(&pattern).map_err(|e| {
                ExecutionError::ExpressionError(format!("invalid regex '{}': {}", pattern, e))
            })?;
            cache.insert(pattern.clone(), regex);
        }
        let matched = cache
            .get(&pattern)
            .map_or(false, |regex| regex.is_match(&any_to_string(subject)));
        Ok(Value::Bool(matched))
    }
}

impl std::fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("scope", &self.scope.id())
            .field("lets", &self.lets.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Integer(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn unary(operator: Operator, value: Value) -> Result<Value, ExecutionError> {
    match (operator, value) {
        (Operator::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (Operator::Minus, Value::Null) => Ok(Value::Null),
        (Operator::Minus, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| ExecutionError::RuntimeError(format!("integer overflow negating {}", n))),
        (Operator::Minus, Value::Float(x)) => Ok(Value::Float(-x)),
        (operator, value) => Err(ExecutionError::TypeError(format!(
            "cannot apply unary {} to {}",
            operator,
            value.type_name()
        ))),
    }
}

fn arithmetic(operator: Operator, left: Value, right: Value) -> Result<Value, ExecutionError> {
    let overflow = || {
        ExecutionError::RuntimeError(format!("integer overflow in {} {} {}", left, operator, right))
    };

    match (&left, &right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::String(a), Value::String(b)) if operator == Operator::Plus => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        (Value::Array(a), Value::Array(b)) if operator == Operator::Plus => {
            Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
        }
        (Value::Int(a), Value::Int(b)) => match operator {
            Operator::Plus => a.checked_add(*b).map(Value::Int).ok_or_else(overflow),
            Operator::Minus => a.checked_sub(*b).map(Value::Int).ok_or_else(overflow),
            Operator::Multiply => a.checked_mul(*b).map(Value::Int).ok_or_else(overflow),
            Operator::Divide => Ok(Value::Float(*a as f64 / *b as f64)),
            _ if *b == 0 => Err(ExecutionError::RuntimeError(format!(
                "division by zero in {} % {}",
                a, b
            ))),
            _ => a.checked_rem(*b).map(Value::Int).ok_or_else(overflow),
        },
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(match operator {
                Operator::Plus => a + b,
                Operator::Minus => a - b,
                Operator::Multiply => a * b,
                Operator::Divide => a / b,
                _ => a % b,
            })),
            _ => Err(ExecutionError::TypeError(format!(
                "cannot apply {} to {} and {}",
                operator,
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::NullAclManager;
    use crate::ast::parse_query;
    use crate::ast::{SelectItem, Statement};
    use crate::config::Config;
    use crate::scope::ScopeBuilder;

    fn scope() -> Scope {
        ScopeBuilder::new(Arc::new(Config::default()), Arc::new(NullAclManager))
            .with_env(Dict::new().set("Hostname", "host1").set("Port", 8080))
            .build()
    }

    /// Evaluate the first select item of `SELECT <expr> FROM x`
    fn eval_with_row(expr: &str, row: Option<&Value>) -> Result<Value, ExecutionError> {
        let query = parse_query(&format!("SELECT {} FROM x", expr)).unwrap();
        let expression = match &query.statements[0] {
            Statement::Select(select) => match &select.items[0] {
                SelectItem::Expression { expression, .. } => expression.clone(),
                SelectItem::Wildcard => panic!("wildcard"),
            },
            Statement::Let(_) => panic!("let"),
        };
        let scope = scope();
        let evaluator = Evaluator::new(&scope, &Context::background());
        evaluator.eval(&expression, row)
    }

    fn eval(expr: &str) -> Value {
        eval_with_row(expr, None).unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(eval("7 / 2"), Value::Float(3.5));
        assert_eq!(eval("7 % 4"), Value::Int(3));
        assert_eq!(eval("1.5 + 1"), Value::Float(2.5));
        assert_eq!(eval("-3 - 1"), Value::Int(-4));
        assert!(matches!(eval("0.0 / 0.0"), Value::Float(x) if x.is_nan()));
        assert_eq!(eval("'a' + 'b'"), Value::from("ab"));
        assert_eq!(eval("[1] + [2]"), Value::from(vec![1, 2]));
        assert_eq!(eval("NULL + 1"), Value::Null);
    }

    #[test]
    fn test_arithmetic_errors() {
        assert!(matches!(
            eval_with_row("1 % 0", None),
            Err(ExecutionError::RuntimeError(_))
        ));
        assert!(matches!(
            eval_with_row("'a' - 1", None),
            Err(ExecutionError::TypeError(_))
        ));
        assert!(eval_with_row("9223372036854775807 + 1", None).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("1 = 1.0"), Value::Bool(true));
        assert_eq!(eval("'a' < 'b'"), Value::Bool(true));
        assert_eq!(eval("2 >= 3"), Value::Bool(false));
        assert_eq!(eval("1 != 'x'"), Value::Bool(true));
        assert_eq!(eval("1 < 'x'"), Value::Bool(false));
        assert_eq!(eval("1 >= 'x'"), Value::Bool(false));
    }

    #[test]
    fn test_logic_short_circuits() {
        assert_eq!(eval("FALSE AND nope(x=1)"), Value::Bool(false));
        assert_eq!(eval("TRUE OR nope(x=1)"), Value::Bool(true));
        assert_eq!(eval("NOT 0"), Value::Bool(true));
        assert!(eval_with_row("TRUE AND nope(x=1)", None).is_err());
    }

    #[test]
    fn test_regex_match() {
        assert_eq!(eval("'hello world' =~ '^hel+o'"), Value::Bool(true));
        assert_eq!(eval("42 =~ '^4'"), Value::Bool(true));
        assert_eq!(eval("NULL =~ '.*'"), Value::Bool(false));
        assert!(matches!(
            eval_with_row("'a' =~ '('", None),
            Err(ExecutionError::ExpressionError(_))
        ));
    }

    #[test]
    fn test_symbol_resolution_order() {
        let row = Value::Dict(Dict::new().set("Hostname", "from-row"));
        assert_eq!(
            eval_with_row("Hostname", Some(&row)).unwrap(),
            Value::from("from-row")
        );
        assert_eq!(eval("Hostname"), Value::from("host1"));
        assert_eq!(eval("Port + 1"), Value::Int(8081));
        assert_eq!(eval("Unknown"), Value::Null);
    }

    #[test]
    fn test_property_access() {
        let row = Value::Dict(Dict::new().set("Inner", Dict::new().set("Name", "x")));
        assert_eq!(eval_with_row("Inner.Name", Some(&row)).unwrap(), Value::from("x"));
        assert_eq!(eval_with_row("Inner.Missing", Some(&row)).unwrap(), Value::Null);
        assert_eq!(eval("[10, 20].1"), Value::Int(20));
        assert_eq!(eval("timestamp(epoch=0).Year"), Value::Int(1970));
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(eval("upper(string=Hostname)"), Value::from("HOST1"));
        assert_eq!(
            eval("format(format='%v:%v', args=[Hostname, Port])"),
            Value::from("host1:8080")
        );
        assert!(matches!(
            eval_with_row("nope()", None),
            Err(ExecutionError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_let_bindings_capture_earlier_definitions() {
        let scope = scope();
        let mut evaluator = Evaluator::new(&scope, &Context::background());
        evaluator.bind("Port", |defined_in| LetBinding::Expression {
            expression: Expression::Binary {
                left: Box::new(Expression::Identifier("Port".to_string())),
                operator: Operator::Plus,
                right: Box::new(Expression::Literal(Literal::Integer(1))),
            },
            defined_in,
        });
        let value = evaluator
            .eval(&Expression::Identifier("Port".to_string()), None)
            .unwrap();
        assert_eq!(value, Value::Int(8081));
    }
}
