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

//! Type definitions for the query client.
//!
//! This module contains data structures organized by domain:
//! - `query`: outbound query requests, cursors, and per-call options
//! - `payload`: raw result payloads and live frames as sent by the server
//! - `value`: decoded values, typed records, and results

pub mod payload;
pub mod query;
pub mod value;

// Re-export commonly used types
pub use payload::{ColumnInfo, LiveFrame, RawPayload};
pub use query::{
    Cursor, FetchOptions, LiveOptions, Query, DEFAULT_FETCH_RETRY_LIMIT, DEFAULT_LIVE_RETRY_LIMIT,
};
pub use value::{QueryResult, Record, Value};
