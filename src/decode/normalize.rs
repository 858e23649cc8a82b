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

//! Raw payload → typed records.
//!
//! Each column is resolved to a table name on its own: a `<table>.<column>`
//! qualifier in the query text wins (so joins decode per side), otherwise the
//! first table after `FROM` is used. Rules are resolved once per column and
//! applied to every row in order.

use crate::decode::resolver::TypeResolver;
use crate::decode::rule::DecodeRule;
use crate::decode::signature::SignatureTable;
use crate::error::{Error, Result};
use crate::types::{ColumnInfo, Query, QueryResult, RawPayload, Record};
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

fn from_clause() -> &'static Regex {
    static FROM: OnceLock<Regex> = OnceLock::new();
    FROM.get_or_init(|| {
        Regex::new(r#"(?i)\bfrom\s+"?([A-Za-z_][A-Za-z0-9_]*)"?"#).expect("valid FROM pattern")
    })
}

/// Table named by the query's `FROM` clause.
pub fn from_table(query_text: &str) -> Option<String> {
    from_clause()
        .captures(query_text)
        .map(|caps| caps[1].to_string())
}

/// Table qualifying `column` in the query text, e.g. `t.col` or `"t"."col"`.
pub fn qualified_table(query_text: &str, column: &str) -> Option<String> {
    let pattern = format!(
        r#"(?i)"?([A-Za-z_][A-Za-z0-9_]*)"?\s*\.\s*"?{}"?(?:[^A-Za-z0-9_]|$)"#,
        regex::escape(column)
    );
    let qualifier = Regex::new(&pattern).ok()?;
    qualifier
        .captures(query_text)
        .map(|caps| caps[1].to_string())
}

/// Column rules resolved for one column list.
#[derive(Debug, Clone)]
struct ColumnRules {
    columns: Vec<ColumnInfo>,
    query_text: String,
    rules: Vec<DecodeRule>,
}

/// Converts untyped payloads into records for one query.
///
/// The rules of the last column list seen are kept, so a live stream whose
/// batches share one shape resolves its columns once.
#[derive(Debug, Clone, Default)]
pub struct RowNormalizer {
    signatures: SignatureTable,
    cache: Option<ColumnRules>,
}

impl RowNormalizer {
    /// Build the normalizer for `query`, parsing its signatures once.
    pub fn for_query(query: &Query) -> Self {
        Self {
            signatures: SignatureTable::from_signatures(&query.signatures),
            cache: None,
        }
    }

    pub fn signatures(&self) -> &SignatureTable {
        &self.signatures
    }

    /// Resolve the decode rule of every column, in column order.
    pub fn column_rules(&self, columns: &[ColumnInfo], query_text: &str) -> Vec<DecodeRule> {
        let resolver = TypeResolver::new(&self.signatures);
        let default_table = from_table(query_text);

        columns
            .iter()
            .map(|column| {
                let table = qualified_table(query_text, &column.name).or_else(|| default_table.clone());
                let rule = resolver.resolve(&column.name, table.as_deref());
                trace!(
                    "Column {} (table={:?}, source_type={}) decodes as {:?}",
                    column.name,
                    table,
                    column.source_type,
                    rule
                );
                rule
            })
            .collect()
    }

    fn cached_rules(&mut self, columns: &[ColumnInfo], query_text: &str) -> &[DecodeRule] {
        let fresh = matches!(
            &self.cache,
            Some(cached) if cached.columns == columns && cached.query_text == query_text
        );
        if !fresh {
            let rules = self.column_rules(columns, query_text);
            self.cache = Some(ColumnRules {
                columns: columns.to_vec(),
                query_text: query_text.to_string(),
                rules,
            });
        }
        self.cache
            .as_ref()
            .map_or(&[][..], |cached| cached.rules.as_slice())
    }

    /// Decode every row of `raw`. Any bad value fails the whole payload.
    pub fn normalize(&mut self, raw: RawPayload, query: &Query) -> Result<QueryResult> {
        let rules = self.cached_rules(&raw.columns, &query.text);

        let rows = raw
            .rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                if row.len() != raw.columns.len() {
                    return Err(Error::decode(format!(
                        "row {} has {} values but {} columns were declared",
                        row_index,
                        row.len(),
                        raw.columns.len()
                    )));
                }

                let mut record = Record::with_capacity(row.len());
                for ((column, rule), value) in raw.columns.iter().zip(rules).zip(row) {
                    let decoded = rule
                        .apply(value)
                        .map_err(|e| with_location(e, row_index, &column.name))?;
                    record.push(column.name.clone(), decoded);
                }
                Ok(record)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(QueryResult {
            cursor: raw.cursor,
            rows,
        })
    }
}

/// Prefix a decode failure with the offending cell's position.
fn with_location(error: Error, row_index: usize, column: &str) -> Error {
    match error {
        Error::Decode { message, source } => Error::Decode {
            message: format!("row {} column {}: {}", row_index, column, message),
            source,
        },
        other => other,
    }
}

/// One-shot normalization of `raw` for `query`.
pub fn normalize(raw: RawPayload, query: &Query) -> Result<QueryResult> {
    RowNormalizer::for_query(query).normalize(raw, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use num_bigint::BigInt;
    use serde_json::json;

    fn payload(columns: &[&str], rows: serde_json::Value) -> RawPayload {
        RawPayload {
            columns: columns
                .iter()
                .map(|name| ColumnInfo {
                    name: name.to_string(),
                    source_type: "text".to_string(),
                })
                .collect(),
            cursor: "8453-100".to_string(),
            rows: serde_json::from_value(rows).unwrap(),
        }
    }

    #[test]
    fn test_from_table() {
        assert_eq!(
            from_table("select * from transfer where x = 1").as_deref(),
            Some("transfer")
        );
        assert_eq!(from_table("SELECT 1 FROM \"Blocks\"").as_deref(), Some("Blocks"));
        assert_eq!(from_table("select \"from\", \"to\" from transfer").as_deref(), Some("transfer"));
        assert_eq!(from_table("select 1"), None);
    }

    #[test]
    fn test_qualified_table() {
        let sql = r#"select t.value, "a"."value2", b . size from transfer t join approval a"#;
        assert_eq!(qualified_table(sql, "value").as_deref(), Some("t"));
        assert_eq!(qualified_table(sql, "value2").as_deref(), Some("a"));
        assert_eq!(qualified_table(sql, "size").as_deref(), Some("b"));
        assert_eq!(qualified_table(sql, "val"), None);
    }

    #[test]
    fn test_normalize_with_signature_table() {
        let query = Query::new(r#"select "from", "to", value, block_num from transfer"#)
            .with_signature(
                "event Transfer(address indexed from, address indexed to, uint256 value)",
            );
        let raw = payload(
            &["from", "to", "value", "block_num"],
            json!([
                ["0xAA", "0xbb", "1000000000000000000", "12"],
                ["0x01", "0x02", "5", "13"]
            ]),
        );

        let result = normalize(raw, &query).unwrap();
        assert_eq!(result.cursor, "8453-100");
        assert_eq!(result.rows.len(), 2);

        let first = &result.rows[0];
        assert_eq!(
            first.keys().collect::<Vec<_>>(),
            vec!["from", "to", "value", "block_num"]
        );
        assert_eq!(first.get("from"), Some(&Value::Hex("0xaa".to_string())));
        assert_eq!(
            first.get("value"),
            Some(&Value::BigInt(BigInt::from(1_000_000_000_000_000_000u64)))
        );
        assert_eq!(
            first.get("block_num"),
            Some(&Value::BigInt(BigInt::from(12)))
        );
    }

    #[test]
    fn test_normalize_join_uses_column_qualifiers() {
        let query = Query::new(
            "select transfer.amount, flag.amount from transfer join flag on true",
        )
        .with_signatures([
            "event Transfer(uint256 amount)",
            "event Flag(bool amount)",
        ]);
        let raw = payload(&["amount"], json!([["7"]]));

        // The first qualifier found for `amount` is `transfer`.
        let result = normalize(raw, &query).unwrap();
        assert_eq!(
            result.rows[0].get("amount"),
            Some(&Value::BigInt(BigInt::from(7)))
        );
    }

    #[test]
    fn test_normalize_fixed_table() {
        let query = Query::new("select block_num, hash, timestamp, topics, block_timestamp from logs");
        let raw = payload(
            &["block_num", "hash", "timestamp", "topics", "block_timestamp"],
            json!([[
                "100",
                "0xABC",
                1700000000,
                ["0x01", "0x02"],
                "1970-01-01 00:01:00.5 +00:00:00"
            ]]),
        );

        let result = normalize(raw, &query).unwrap();
        let row = &result.rows[0];
        assert_eq!(row.get("timestamp"), Some(&Value::Int(1_700_000_000)));
        assert_eq!(
            row.get("topics"),
            Some(&Value::Array(vec![
                Value::Hex("0x01".into()),
                Value::Hex("0x02".into())
            ]))
        );
        assert_eq!(row.get("block_timestamp"), Some(&Value::Int(60)));
    }

    #[test]
    fn test_unknown_columns_pass_through() {
        let query = Query::new("select count(*) as total, 'x' as label from blocks");
        let raw = payload(&["total", "label"], json!([[42, "x"]]));

        let result = normalize(raw, &query).unwrap();
        assert_eq!(result.rows[0].get("total"), Some(&Value::Json(json!(42))));
        assert_eq!(result.rows[0].get("label"), Some(&Value::Json(json!("x"))));
    }

    #[test]
    fn test_row_count_and_order_preserved() {
        let query = Query::new("select num from blocks");
        let raw = payload(&["num"], json!([[3], [1], [2]]));

        let result = normalize(raw, &query).unwrap();
        let nums: Vec<_> = result
            .rows
            .iter()
            .map(|r| r.get("num").unwrap().as_big_int().unwrap().clone())
            .collect();
        assert_eq!(nums, vec![BigInt::from(3), BigInt::from(1), BigInt::from(2)]);
    }

    #[test]
    fn test_bad_value_fails_whole_payload() {
        let query = Query::new("select hash from blocks");
        let raw = payload(&["hash"], json!([["0x01"], ["not-hex"]]));

        let err = normalize(raw, &query).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.to_string().contains("row 1 column hash"));
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let query = Query::new("select hash, num from blocks");
        let raw = payload(&["hash", "num"], json!([["0x01"]]));
        assert!(normalize(raw, &query).is_err());
    }

    #[test]
    fn test_column_rules_reused_across_batches() {
        let query = Query::new("select num, hash from blocks");
        let mut normalizer = RowNormalizer::for_query(&query);

        normalizer
            .normalize(payload(&["num", "hash"], json!([["1", "0x01"]])), &query)
            .unwrap();
        let rules = normalizer.cache.as_ref().unwrap().rules.as_ptr();
        let result = normalizer
            .normalize(payload(&["num", "hash"], json!([["2", "0x02"]])), &query)
            .unwrap();
        assert_eq!(normalizer.cache.as_ref().unwrap().rules.as_ptr(), rules);
        assert_eq!(result.rows[0].get("hash"), Some(&Value::Hex("0x02".into())));

        // A new column list resolves its own rules.
        let result = normalizer
            .normalize(payload(&["hash"], json!([["0xAB"]])), &query)
            .unwrap();
        assert_eq!(
            normalizer.cache.as_ref().unwrap().rules,
            vec![DecodeRule::Hex]
        );
        assert_eq!(result.rows[0].get("hash"), Some(&Value::Hex("0xab".into())));
    }

    #[test]
    fn test_empty_rows() {
        let query = Query::new("select hash from blocks");
        let raw = payload(&["hash"], json!([]));
        let result = normalize(raw, &query).unwrap();
        assert!(result.rows.is_empty());
    }
}
