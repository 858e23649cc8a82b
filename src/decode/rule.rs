// Copyright (c) 2025 Chainquery Client Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Column decode rules.
//!
//! A [`DecodeRule`] is the closed set of coercions applied to wire values.
//! Rules are resolved once per column and then applied to every row.

use crate::error::{Error, Result};
use crate::types::Value;
use chrono::{NaiveDate, NaiveTime};
use num_bigint::BigInt;
use serde_json::Value as JsonValue;

/// Integers declared at or below this width decode to `i64`.
pub const SAFE_INTEGER_BITS: u32 = 48;

/// How one column's wire values become [`Value`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeRule {
    /// `0x`-prefixed hex string, normalized to lowercase.
    Hex,
    Bool,
    /// Number or decimal string to `i64`.
    Int,
    /// Decimal string or integral number to an arbitrary-precision integer.
    BigInt,
    /// String kept as text; non-string values pass through untouched.
    Text,
    /// `"YYYY-MM-DD HH:MM:SS[.f] [+-]HH:MM:SS"` to UTC epoch seconds.
    Timestamp,
    Array(Box<DecodeRule>),
    /// No coercion.
    Passthrough,
}

impl DecodeRule {
    pub fn array_of(element: DecodeRule) -> Self {
        Self::Array(Box::new(element))
    }

    /// Decode one wire value. SQL nulls stay null under every rule.
    pub fn apply(&self, value: &JsonValue) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match self {
            Self::Hex => decode_hex(value),
            Self::Bool => value
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| mismatch("boolean", value)),
            Self::Int => decode_int(value),
            Self::BigInt => decode_big_int(value),
            Self::Text => Ok(match value {
                JsonValue::String(s) => Value::Text(s.clone()),
                other => Value::Json(other.clone()),
            }),
            Self::Timestamp => {
                let text = value.as_str().ok_or_else(|| mismatch("timestamp", value))?;
                parse_timestamp(text).map(Value::Int)
            }
            Self::Array(element) => {
                let items = value.as_array().ok_or_else(|| mismatch("array", value))?;
                items
                    .iter()
                    .map(|item| element.apply(item))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            Self::Passthrough => Ok(Value::Json(value.clone())),
        }
    }
}

fn mismatch(expected: &str, value: &JsonValue) -> Error {
    Error::decode(format!("expected {}, got {}", expected, value))
}

fn decode_hex(value: &JsonValue) -> Result<Value> {
    let text = value.as_str().ok_or_else(|| mismatch("hex string", value))?;
    if !(text.starts_with("0x") || text.starts_with("0X")) {
        return Err(Error::decode(format!(
            "expected 0x-prefixed hex string, got {:?}",
            text
        )));
    }
    Ok(Value::Hex(text.to_ascii_lowercase()))
}

fn decode_int(value: &JsonValue) -> Result<Value> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| mismatch("64-bit integer", value)),
        JsonValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| Error::decode(format!("invalid integer {:?}: {}", s, e))),
        _ => Err(mismatch("integer", value)),
    }
}

fn decode_big_int(value: &JsonValue) -> Result<Value> {
    match value {
        JsonValue::String(s) => s
            .trim()
            .parse::<BigInt>()
            .map(Value::BigInt)
            .map_err(|e| Error::decode(format!("invalid big integer {:?}: {}", s, e))),
        JsonValue::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(Value::BigInt(BigInt::from(u)))
            } else if let Some(i) = n.as_i64() {
                Ok(Value::BigInt(BigInt::from(i)))
            } else {
                Err(mismatch("integral number", value))
            }
        }
        _ => Err(mismatch("big integer", value)),
    }
}

/// Parse a server timestamp into UTC epoch seconds.
///
/// The date and time halves split on the first space. Fractional seconds
/// and the trailing offset are discarded.
pub fn parse_timestamp(text: &str) -> Result<i64> {
    let invalid = || Error::decode(format!("invalid timestamp {:?}", text));

    let (date, rest) = text.trim().split_once(' ').ok_or_else(invalid)?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;

    let time = rest
        .split(|c: char| c == ' ' || c == '+' || c == '-')
        .next()
        .unwrap_or_default();
    let whole_seconds = time.split('.').next().unwrap_or_default();
    let time = NaiveTime::parse_from_str(whole_seconds, "%H:%M:%S").map_err(|_| invalid())?;

    Ok(date.and_time(time).and_utc().timestamp())
}
