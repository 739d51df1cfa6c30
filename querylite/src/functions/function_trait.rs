// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Generic function trait for expression evaluation
//!
//! Functions take named arguments, already evaluated, and return one value.

use crate::acl::{AclError, Permission};
use crate::exec::error::ExecutionError;
use crate::scope::Scope;
use crate::types::{Dict, Value};

/// Error type for function execution
#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    #[error("Missing required argument '{argument}'")]
    MissingArgument { argument: String },

    #[error("Unexpected argument '{argument}'")]
    UnexpectedArgument { argument: String },

    #[error("Invalid argument type: {message}")]
    InvalidArgumentType { message: String },

    #[error("Function execution failed: {message}")]
    ExecutionError { message: String },

    #[error("Access control error: {0}")]
    Acl(#[from] AclError),
}

impl FunctionError {
    /// Attach the function name and lift into the evaluator's error type
    pub fn into_execution_error(self, function: &str) -> ExecutionError {
        match self {
            FunctionError::MissingArgument { argument } => ExecutionError::InvalidArgument {
                callee: format!("{}()", function),
                argument,
                message: "missing required argument".to_string(),
            },
            FunctionError::UnexpectedArgument { argument } => ExecutionError::InvalidArgument {
                callee: format!("{}()", function),
                argument,
                message: "unexpected argument".to_string(),
            },
            FunctionError::InvalidArgumentType { message } => {
                ExecutionError::TypeError(format!("{}(): {}", function, message))
            }
            FunctionError::ExecutionError { message } => {
                ExecutionError::RuntimeError(format!("{}(): {}", function, message))
            }
            FunctionError::Acl(e) => ExecutionError::AclError(e),
        }
    }
}

/// Result type for function execution
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Function execution context
pub struct FunctionContext<'a> {
    /// Named arguments in call order
    pub arguments: Dict,
    /// Scope the call is evaluated in
    pub scope: &'a Scope,
}

impl<'a> FunctionContext<'a> {
    pub fn new(arguments: Dict, scope: &'a Scope) -> Self {
        Self { arguments, scope }
    }

    /// Optional argument; absent and NULL are both `None`
    pub fn get_argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name).filter(|value| !value.is_null())
    }

    /// Argument that must be present (it may still be NULL)
    pub fn require_argument(&self, name: &str) -> FunctionResult<&Value> {
        self.arguments
            .get(name)
            .ok_or_else(|| FunctionError::MissingArgument {
                argument: name.to_string(),
            })
    }

    /// String argument that must be present; NULL yields `None`
    pub fn string_argument(&self, name: &str) -> FunctionResult<Option<&str>> {
        match self.require_argument(name)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(FunctionError::InvalidArgumentType {
                message: format!("'{}' must be a String, got {}", name, other.type_name()),
            }),
        }
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }
}

/// Core trait for all functions
pub trait Function: Send + Sync + std::fmt::Debug {
    /// Name the function is registered under
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Accepted argument names
    fn argument_names(&self) -> &'static [&'static str];

    /// Execute the function with the given context
    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value>;

    /// Permission the caller must hold, if any
    fn required_permission(&self) -> Option<Permission> {
        None
    }

    /// Whether any argument name is accepted
    fn is_variadic(&self) -> bool {
        false
    }
}
