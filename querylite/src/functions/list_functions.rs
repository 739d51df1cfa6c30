// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Collection functions: len, dict

use super::function_trait::{Function, FunctionContext, FunctionError, FunctionResult};
use crate::types::Value;

/// len(list=) - length of an array, dict or string
#[derive(Debug)]
pub struct LenFunction;

impl LenFunction {
    pub fn new() -> Self {
        Self
    }
}

impl Function for LenFunction {
    fn name(&self) -> &str {
        "len"
    }

    fn description(&self) -> &str {
        "Returns the number of elements of an array or dict, or characters of a string"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["list"]
    }

    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value> {
        let length = match context.require_argument("list")? {
            Value::Null => 0,
            Value::Array(items) => items.len(),
            Value::Dict(dict) => dict.len(),
            Value::String(s) => s.chars().count(),
            other => {
                return Err(FunctionError::InvalidArgumentType {
                    message: format!("cannot take the length of {}", other.type_name()),
                })
            }
        };
        Ok(Value::from(length))
    }
}

/// dict(...) - collects every argument into a dict, in call order
#[derive(Debug)]
pub struct DictFunction;

impl DictFunction {
    pub fn new() -> Self {
        Self
    }
}

impl Function for DictFunction {
    fn name(&self) -> &str {
        "dict"
    }

    fn description(&self) -> &str {
        "Builds a dict from its named arguments"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value> {
        Ok(Value::Dict(context.arguments.clone()))
    }

    fn is_variadic(&self) -> bool {
        true
    }
}
