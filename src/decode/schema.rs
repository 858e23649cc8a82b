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

//! Built-in tables with a statically known column-type table.

use crate::decode::rule::DecodeRule;

/// Tables whose columns are decoded from the fixed table only.
pub const FIXED_TABLES: [&str; 3] = ["blocks", "txs", "logs"];

/// Whether `table` is one of the built-in tables (case-insensitive).
pub fn is_fixed_table(table: &str) -> bool {
    FIXED_TABLES
        .iter()
        .any(|fixed| fixed.eq_ignore_ascii_case(table))
}

/// Decode rule for a built-in column name.
pub fn fixed_column_rule(column: &str) -> Option<DecodeRule> {
    let rule = match column {
        "address" | "data" | "extra_data" | "from" | "hash" | "input" | "miner"
        | "receipts_root" | "state_root" | "to" | "tx_hash" => DecodeRule::Hex,
        // Sent as decimal strings.
        "block_num" | "gas" | "gas_price" | "nonce" | "value" => DecodeRule::BigInt,
        // Already numeric on the wire.
        "gas_limit" | "gas_used" | "num" => DecodeRule::BigInt,
        "chain" | "idx" | "log_idx" | "size" | "timestamp" | "type" => DecodeRule::Int,
        "topics" => DecodeRule::array_of(DecodeRule::Hex),
        "block_timestamp" => DecodeRule::Timestamp,
        _ => return None,
    };
    Some(rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_tables() {
        assert!(is_fixed_table("blocks"));
        assert!(is_fixed_table("TXS"));
        assert!(is_fixed_table("logs"));
        assert!(!is_fixed_table("transfer"));
    }

    #[test]
    fn test_fixed_column_rules() {
        for hex in [
            "address",
            "data",
            "extra_data",
            "from",
            "hash",
            "input",
            "miner",
            "receipts_root",
            "state_root",
            "to",
            "tx_hash",
        ] {
            assert_eq!(fixed_column_rule(hex), Some(DecodeRule::Hex), "{}", hex);
        }
        for big in [
            "block_num",
            "gas",
            "gas_price",
            "nonce",
            "value",
            "gas_limit",
            "gas_used",
            "num",
        ] {
            assert_eq!(fixed_column_rule(big), Some(DecodeRule::BigInt), "{}", big);
        }
        for int in ["chain", "idx", "log_idx", "size", "timestamp", "type"] {
            assert_eq!(fixed_column_rule(int), Some(DecodeRule::Int), "{}", int);
        }
        assert_eq!(
            fixed_column_rule("topics"),
            Some(DecodeRule::array_of(DecodeRule::Hex))
        );
        assert_eq!(
            fixed_column_rule("block_timestamp"),
            Some(DecodeRule::Timestamp)
        );
        assert_eq!(fixed_column_rule("amount"), None);
    }
}
