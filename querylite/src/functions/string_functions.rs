// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! String function implementations
//!
//! - upper: converts a string to uppercase
//! - lower: converts a string to lowercase
//! - str: display string of any value
//! - format: `%v` placeholder substitution

use super::function_trait::{Function, FunctionContext, FunctionError, FunctionResult};
use crate::types::{any_to_string, Value};

// ==============================================================================
// UPPER FUNCTION
// ==============================================================================

/// upper(string=) - converts string values to uppercase
#[derive(Debug)]
pub struct UpperFunction;

impl UpperFunction {
    pub fn new() -> Self {
        Self
    }
}

impl Function for UpperFunction {
    fn name(&self) -> &str {
        "upper"
    }

    fn description(&self) -> &str {
        "Converts string values to uppercase"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["string"]
    }

    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value> {
        Ok(context
            .string_argument("string")?
            .map(|s| Value::String(s.to_uppercase()))
            .unwrap_or(Value::Null))
    }
}

// ==============================================================================
// LOWER FUNCTION
// ==============================================================================

/// lower(string=) - converts string values to lowercase
#[derive(Debug)]
pub struct LowerFunction;

impl LowerFunction {
    pub fn new() -> Self {
        Self
    }
}

impl Function for LowerFunction {
    fn name(&self) -> &str {
        "lower"
    }

    fn description(&self) -> &str {
        "Converts string values to lowercase"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["string"]
    }

    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value> {
        Ok(context
            .string_argument("string")?
            .map(|s| Value::String(s.to_lowercase()))
            .unwrap_or(Value::Null))
    }
}

// ==============================================================================
// STR FUNCTION
// ==============================================================================

/// str(str=) - display string of any value
#[derive(Debug)]
pub struct StrFunction;

impl StrFunction {
    pub fn new() -> Self {
        Self
    }
}

impl Function for StrFunction {
    fn name(&self) -> &str {
        "str"
    }

    fn description(&self) -> &str {
        "Converts any value to its display string"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["str"]
    }

    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value> {
        let value = context.require_argument("str")?;
        Ok(Value::String(any_to_string(value)))
    }
}

// ==============================================================================
// FORMAT FUNCTION
// ==============================================================================

/// format(format=, args=) - replaces each `%v` with the next argument
///
/// `args` may be an array or a single value. `%%` is a literal percent sign.
/// Placeholders beyond the supplied arguments render empty.
#[derive(Debug)]
pub struct FormatFunction;

impl FormatFunction {
    pub fn new() -> Self {
        Self
    }
}

impl Function for FormatFunction {
    fn name(&self) -> &str {
        "format"
    }

    fn description(&self) -> &str {
        "Substitutes %v placeholders with argument display strings"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["format", "args"]
    }

    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value> {
        let template = match context.string_argument("format")? {
            Some(t) => t,
            None => return Ok(Value::Null),
        };
        let args: Vec<Value> = match context.get_argument("args") {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        };

        let mut output = String::with_capacity(template.len());
        let mut next_arg = args.iter();
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                output.push(c);
                continue;
            }
            match chars.peek() {
                Some('v') => {
                    chars.next();
                    if let Some(arg) = next_arg.next() {
                        output.push_str(&any_to_string(arg));
                    }
                }
                Some('%') => {
                    chars.next();
                    output.push('%');
                }
                _ => output.push('%'),
            }
        }
        if next_arg.next().is_some() {
            return Err(FunctionError::InvalidArgumentType {
                message: format!("more args than placeholders in '{}'", template),
            });
        }
        Ok(Value::String(output))
    }
}
