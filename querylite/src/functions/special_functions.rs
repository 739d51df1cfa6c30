// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Conditional and host functions: if, getenv

use super::function_trait::{Function, FunctionContext, FunctionResult};
use crate::acl::Permission;
use crate::types::Value;

/// if(condition=, then=, else=) - picks `then` or `else` by truthiness
#[derive(Debug)]
pub struct IfFunction;

impl IfFunction {
    pub fn new() -> Self {
        Self
    }
}

impl Function for IfFunction {
    fn name(&self) -> &str {
        "if"
    }

    fn description(&self) -> &str {
        "Returns `then` when the condition is truthy, otherwise `else`"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["condition", "then", "else"]
    }

    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value> {
        let condition = context.require_argument("condition")?;
        let branch = if condition.is_truthy() { "then" } else { "else" };
        Ok(context.arguments.get(branch).cloned().unwrap_or(Value::Null))
    }
}

/// getenv(var=) - value of a process environment variable
#[derive(Debug)]
pub struct GetenvFunction;

impl GetenvFunction {
    pub fn new() -> Self {
        Self
    }
}

impl Function for GetenvFunction {
    fn name(&self) -> &str {
        "getenv"
    }

    fn description(&self) -> &str {
        "Reads a process environment variable"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["var"]
    }

    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value> {
        let name = match context.string_argument("var")? {
            Some(name) => name,
            None => return Ok(Value::Null),
        };
        Ok(std::env::var(name).map(Value::String).unwrap_or(Value::Null))
    }

    fn required_permission(&self) -> Option<Permission> {
        Some(Permission::MachineState)
    }
}
