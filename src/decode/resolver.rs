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

//! Column name → decode rule resolution.

use crate::decode::rule::DecodeRule;
use crate::decode::schema::{fixed_column_rule, is_fixed_table};
use crate::decode::signature::SignatureTable;

/// Two-level lookup: signature-derived rules first, then the fixed table.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    signatures: &'a SignatureTable,
}

impl<'a> TypeResolver<'a> {
    pub fn new(signatures: &'a SignatureTable) -> Self {
        Self { signatures }
    }

    /// Resolve the rule for `column`, optionally qualified by `table`.
    ///
    /// Built-in tables use the fixed table exclusively. Other tables consult
    /// the signature table, then the fixed table, then pass values through.
    pub fn resolve(&self, column: &str, table: Option<&str>) -> DecodeRule {
        let column = column.to_lowercase();

        if let Some(table) = table {
            if !is_fixed_table(table) {
                if let Some(rule) = self.signatures.column_rule(table, &column) {
                    return rule.clone();
                }
            }
        }

        fixed_column_rule(&column).unwrap_or(DecodeRule::Passthrough)
    }
}
