// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Display-string conversion for table and CSV cells

use super::value::Value;
use chrono::SecondsFormat;
use serde::{Serialize, Serializer};

/// Convert any value into its display string
///
/// Strings are emitted verbatim and null becomes the empty string. Compound
/// values are rendered as compact JSON so that a cell always holds a single
/// line of text. Finite floats use the JSON number form (`2.0`, `1e21`)
/// whether they stand alone or sit inside a compound value. The output
/// depends only on the input value.
pub fn any_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => match serde_json::Number::from_f64(*f) {
            Some(number) => number.to_string(),
            None => f.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Value::Array(_) | Value::Dict(_) => match serde_json::to_string(&Lossy(value)) {
            Ok(json) => json,
            Err(e) => {
                log::debug!("Compound value has no JSON form: {}", e);
                String::new()
            }
        },
    }
}

/// Serializes like `Value` but writes non-finite floats as `null`
struct Lossy<'a>(&'a Value);

impl Serialize for Lossy<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Float(f) if !f.is_finite() => serializer.serialize_unit(),
            Value::Array(items) => serializer.collect_seq(items.iter().map(Lossy)),
            Value::Dict(dict) => {
                serializer.collect_map(dict.iter().map(|(key, item)| (key, Lossy(item))))
            }
            other => other.serialize(serializer),
        }
    }
}
