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

//! Row decoding.
//!
//! - `rule`: the closed set of value coercions
//! - `schema`: built-in tables and their fixed column types
//! - `signature`: contract signatures → per-query column types
//! - `resolver`: column → rule lookup
//! - `normalize`: raw payload → typed records

pub mod normalize;
pub mod resolver;
pub mod rule;
pub mod schema;
pub mod signature;

pub use normalize::{normalize, RowNormalizer};
pub use resolver::TypeResolver;
pub use rule::{parse_timestamp, DecodeRule};
pub use schema::{fixed_column_rule, is_fixed_table, FIXED_TABLES};
pub use signature::{parse_signature, rule_for_type, Member, MemberKind, SignatureTable};
