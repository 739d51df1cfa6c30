// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Temporal functions: now, timestamp

use super::function_trait::{Function, FunctionContext, FunctionError, FunctionResult};
use crate::types::Value;
use chrono::{DateTime, Utc};

/// now() - current UTC time
#[derive(Debug)]
pub struct NowFunction;

impl NowFunction {
    pub fn new() -> Self {
        Self
    }
}

impl Function for NowFunction {
    fn name(&self) -> &str {
        "now"
    }

    fn description(&self) -> &str {
        "Returns the current UTC time"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn execute(&self, _context: &FunctionContext) -> FunctionResult<Value> {
        Ok(Value::Timestamp(Utc::now()))
    }
}

/// timestamp(epoch=) - timestamp from seconds since the Unix epoch
///
/// Accepts an integer or fractional number of seconds, an RFC 3339 string,
/// or an existing timestamp.
#[derive(Debug)]
pub struct TimestampFunction;

impl TimestampFunction {
    pub fn new() -> Self {
        Self
    }
}

fn out_of_range(epoch: impl std::fmt::Display) -> FunctionError {
    FunctionError::ExecutionError {
        message: format!("epoch {} is out of range", epoch),
    }
}

impl Function for TimestampFunction {
    fn name(&self) -> &str {
        "timestamp"
    }

    fn description(&self) -> &str {
        "Converts seconds since the Unix epoch to a timestamp"
    }

    fn argument_names(&self) -> &'static [&'static str] {
        &["epoch"]
    }

    fn execute(&self, context: &FunctionContext) -> FunctionResult<Value> {
        let ts = match context.require_argument("epoch")? {
            Value::Null => return Ok(Value::Null),
            Value::Timestamp(ts) => *ts,
            Value::Int(secs) => {
                DateTime::<Utc>::from_timestamp(*secs, 0).ok_or_else(|| out_of_range(secs))?
            }
            Value::Float(secs) if secs.is_finite() => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
                DateTime::<Utc>::from_timestamp(whole as i64, nanos)
                    .ok_or_else(|| out_of_range(secs))?
            }
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map_err(|e| FunctionError::InvalidArgumentType {
                    message: format!("'{}' is not an RFC 3339 time: {}", s, e),
                })?
                .with_timezone(&Utc),
            other => {
                return Err(FunctionError::InvalidArgumentType {
                    message: format!("epoch must be a number, got {}", other.type_name()),
                })
            }
        };
        Ok(Value::Timestamp(ts))
    }
}
