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

//! Decoded cell values, typed records, and query results.

use num_bigint::BigInt;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Integer that fits in 64 bits (declared width of 48 bits or less).
    Int(i64),
    /// Arbitrary-precision integer.
    BigInt(BigInt),
    /// `0x`-prefixed lowercase hex string.
    Hex(String),
    Text(String),
    Array(Vec<Value>),
    /// Raw wire value, left untouched.
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_big_int(&self) -> Option<&BigInt> {
        match self {
            Self::BigInt(i) => Some(i),
            _ => None,
        }
    }

    /// String content of hex and text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Hex(s) | Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            // Decimal string keeps full precision for JSON consumers.
            Self::BigInt(i) => serializer.serialize_str(&i.to_string()),
            Self::Hex(s) | Self::Text(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Json(value) => value.serialize(serializer),
        }
    }
}

/// One typed row. Field order follows the result's column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: String, value: Value) {
        self.fields.push((name, value));
    }

    /// Value of the first column with the given name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Normalized result of one exchange or one live batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Cursor exactly as returned by the server.
    pub cursor: String,
    pub rows: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        let mut record = Record::with_capacity(3);
        record.push("block_num".to_string(), Value::BigInt(BigInt::from(42u64)));
        record.push("hash".to_string(), Value::Hex("0xab".to_string()));
        record.push("success".to_string(), Value::Bool(true));
        record
    }

    #[test]
    fn test_record_preserves_column_order() {
        let record = sample_record();
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["block_num", "hash", "success"]);
        assert_eq!(record.len(), 3);
        assert_eq!(record.get("hash").and_then(Value::as_str), Some("0xab"));
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn test_record_serializes_big_ints_as_strings() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert_eq!(json, r#"{"block_num":"42","hash":"0xab","success":true}"#);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(7).as_i64(), Some(7));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(false).as_bool(), Some(false));
        assert_eq!(
            Value::Array(vec![Value::Int(1)]).as_array(),
            Some(&[Value::Int(1)][..])
        );
        assert!(Value::Text("x".into()).as_big_int().is_none());
    }
}
