// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Member protocol for schema-less rows
//!
//! Rows carry no declared schema. Column discovery and cell extraction go
//! through [`Associative`], which each concrete representation implements:
//! dictionaries are map-like, timestamps are struct-like, arrays are
//! index-addressable, and [`Value`] dispatches by variant.

use super::dict::Dict;
use super::value::Value;
use chrono::{DateTime, Datelike, SecondsFormat, Timelike, Utc};

/// Member enumeration and lookup by name
pub trait Associative {
    /// Ordered member names
    fn members(&self) -> Vec<String>;

    /// Look up one member. `None` means the member is absent.
    fn associative(&self, name: &str) -> Option<Value>;
}

impl Associative for Dict {
    fn members(&self) -> Vec<String> {
        self.keys().map(str::to_string).collect()
    }

    fn associative(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

const TIMESTAMP_MEMBERS: &[&str] = &[
    "Unix", "Year", "Month", "Day", "Hour", "Minute", "Second", "String",
];

impl Associative for DateTime<Utc> {
    fn members(&self) -> Vec<String> {
        TIMESTAMP_MEMBERS.iter().map(|m| m.to_string()).collect()
    }

    fn associative(&self, name: &str) -> Option<Value> {
        let value = match name {
            "Unix" => Value::Int(self.timestamp()),
            "Year" => Value::Int(self.year() as i64),
            "Month" => Value::Int(self.month() as i64),
            "Day" => Value::Int(self.day() as i64),
            "Hour" => Value::Int(self.hour() as i64),
            "Minute" => Value::Int(self.minute() as i64),
            "Second" => Value::Int(self.second() as i64),
            "String" => Value::String(self.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            _ => return None,
        };
        Some(value)
    }
}

impl Associative for Vec<Value> {
    fn members(&self) -> Vec<String> {
        Vec::new()
    }

    fn associative(&self, name: &str) -> Option<Value> {
        if name == "Len" {
            return Some(Value::Int(self.len() as i64));
        }
        name.parse::<usize>()
            .ok()
            .and_then(|index| self.get(index).cloned())
    }
}

impl Associative for Value {
    fn members(&self) -> Vec<String> {
        match self {
            Value::Dict(dict) => dict.members(),
            Value::Timestamp(ts) => ts.members(),
            Value::Array(items) => items.members(),
            _ => Vec::new(),
        }
    }

    fn associative(&self, name: &str) -> Option<Value> {
        match self {
            Value::Dict(dict) => dict.associative(name),
            Value::Timestamp(ts) => ts.associative(name),
            Value::Array(items) => items.associative(name),
            _ => None,
        }
    }
}
