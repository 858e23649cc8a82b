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

//! Contract signature parsing.
//!
//! Signatures such as `event Transfer(address indexed from, address indexed to, uint256 value)`
//! name a virtual table (`transfer`) and its typed columns. Only the
//! `{name, type}` pair of each parameter is extracted; ABI correctness is not
//! checked. SQL folds unquoted identifiers to lowercase, so table and column
//! names are stored lowercased.

use crate::decode::rule::{DecodeRule, SAFE_INTEGER_BITS};
use std::collections::HashMap;
use tracing::warn;

/// Keywords that may appear between a parameter's type and its name.
const PARAMETER_KEYWORDS: [&str; 4] = ["indexed", "memory", "calldata", "storage"];

/// Kind of contract interface member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Function,
    Event,
}

/// One named, typed parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub abi_type: String,
}

/// A parsed `function` or `event` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub kind: MemberKind,
    pub name: String,
    pub parameters: Vec<Parameter>,
}

/// Parse one signature. Returns `None` when it is not a `function ` or
/// `event ` declaration with a parameter list.
pub fn parse_signature(signature: &str) -> Option<Member> {
    let signature = signature.trim();
    let (kind, rest) = if let Some(rest) = signature.strip_prefix("function ") {
        (MemberKind::Function, rest)
    } else if let Some(rest) = signature.strip_prefix("event ") {
        (MemberKind::Event, rest)
    } else {
        return None;
    };

    let open = rest.find('(')?;
    let name = rest[..open].trim();
    if name.is_empty() {
        return None;
    }
    let close = matching_paren(rest, open)?;

    let parameters = split_top_level(&rest[open + 1..close])
        .into_iter()
        .filter_map(parse_parameter)
        .collect();

    Some(Member {
        kind,
        name: name.to_string(),
        parameters,
    })
}

/// Index of the `)` matching the `(` at `open`.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// `<type> [indexed] <name>`; unnamed parameters yield `None`.
fn parse_parameter(param: &str) -> Option<Parameter> {
    // The type ends at the first whitespace outside any tuple parentheses.
    let mut depth = 0i32;
    let mut type_end = param.len();
    for (i, c) in param.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                type_end = i;
                break;
            }
            _ => {}
        }
    }

    let abi_type = param[..type_end].trim();
    let name = param[type_end..]
        .split_whitespace()
        .filter(|token| !PARAMETER_KEYWORDS.contains(token))
        .last()?;

    Some(Parameter {
        name: name.to_string(),
        abi_type: abi_type.to_string(),
    })
}

/// Decode rule for a declared ABI type.
pub fn rule_for_type(abi_type: &str) -> DecodeRule {
    let abi_type = abi_type.trim();

    if let Some(element) = strip_array_suffix(abi_type) {
        return match rule_for_type(element) {
            rule @ (DecodeRule::Int | DecodeRule::BigInt | DecodeRule::Array(_)) => {
                DecodeRule::array_of(rule)
            }
            DecodeRule::Hex if element.starts_with("bytes") => DecodeRule::array_of(DecodeRule::Hex),
            _ => DecodeRule::Text,
        };
    }

    match abi_type {
        "address" => DecodeRule::Hex,
        "bool" => DecodeRule::Bool,
        t if t.starts_with("bytes") => DecodeRule::Hex,
        t => match integer_bits(t) {
            Some(bits) if bits <= SAFE_INTEGER_BITS => DecodeRule::Int,
            Some(_) => DecodeRule::BigInt,
            None => DecodeRule::Text,
        },
    }
}

/// `uint256[]` -> `uint256`, `bytes32[4]` -> `bytes32`.
fn strip_array_suffix(abi_type: &str) -> Option<&str> {
    if !abi_type.ends_with(']') {
        return None;
    }
    abi_type.rfind('[').map(|open| &abi_type[..open])
}

/// Declared width of an `int*`/`uint*` type; unspecified means 256.
fn integer_bits(abi_type: &str) -> Option<u32> {
    let digits = abi_type
        .strip_prefix("uint")
        .or_else(|| abi_type.strip_prefix("int"))?;
    if digits.is_empty() {
        return Some(256);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Per-query `table -> column -> rule` lookup built from signatures.
#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    tables: HashMap<String, HashMap<String, DecodeRule>>,
}

impl SignatureTable {
    /// Build the table from caller-supplied signatures.
    ///
    /// Signatures that cannot be parsed are skipped with a warning; the
    /// server remains the authority on their validity.
    pub fn from_signatures<S: AsRef<str>>(signatures: &[S]) -> Self {
        let mut tables: HashMap<String, HashMap<String, DecodeRule>> = HashMap::new();

        for signature in signatures {
            let Some(member) = parse_signature(signature.as_ref()) else {
                warn!("Skipping unparsable signature: {}", signature.as_ref());
                continue;
            };

            let columns = tables.entry(member.name.to_lowercase()).or_default();
            for param in member.parameters {
                columns
                    .entry(param.name.to_lowercase())
                    .or_insert_with(|| rule_for_type(&param.abi_type));
            }
        }

        Self { tables }
    }

    /// Rule for `table.column`, if a signature declared it.
    pub fn column_rule(&self, table: &str, column: &str) -> Option<&DecodeRule> {
        self.tables
            .get(&table.to_lowercase())?
            .get(&column.to_lowercase())
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(&table.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
