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

//! Client for a remote SQL query service over blockchain data.
//!
//! ## Overview
//!
//! The [`Client`] exposes two operations:
//! - [`Client::fetch`] - run a query once against `POST /query`
//! - [`Client::live`] - follow a query as a stream of batches from
//!   `GET /query-live`, resuming from the last cursor after transient
//!   failures
//!
//! Rows come back untyped on the wire. Each column is decoded according to
//! the built-in schema of the `blocks`, `txs`, and `logs` tables or to the
//! event and function signatures supplied with the query.
//!
//! ## Example
//!
//! ```ignore
//! use chainquery_client::{Client, ClientConfig, Cursor, FetchOptions, Query};
//!
//! let client = Client::new(ClientConfig::default().with_api_key("..."))?;
//! let query = Query::new("select \"from\", \"to\", value from transfer")
//!     .with_signature("event Transfer(address indexed from, address indexed to, uint value)")
//!     .with_cursor(Cursor::block(8453, 1_000_000));
//!
//! let result = client.fetch(&query, FetchOptions::default()).await?;
//! for row in &result.rows {
//!     println!("{:?}", row.get("value"));
//! }
//! ```
//!
//! ## Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `chainquery.base_url` | `https://api.indexsupply.net` | Service URL |
//! | `chainquery.api_key` | unset | Sent as the `Api-Key` header |
//! | `chainquery.connect_timeout_ms` | 30000 | Connect timeout |
//! | `chainquery.read_timeout_ms` | 0 (none) | Single-shot query timeout |
//! | `chainquery.retry.base_delay_ms` | 200 | First backoff delay |
//! | `chainquery.retry.max_delay_ms` | 30000 | Backoff cap |
//! | `chainquery.log_level` | `warn` | Crate log level |
//! | `chainquery.log_file` | stderr | Log destination |

pub mod auth;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod logging;
pub mod reader;
pub mod telemetry;
pub mod types;

pub use client::{Client, LiveStream, QueryExecutor, RetryPolicy};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{Error, Result, StreamErrorKind};
pub use telemetry::{Event, EventKind, EventPayload, EventReceiver, EventSink};
pub use tokio_util::sync::CancellationToken;
pub use types::{Cursor, FetchOptions, LiveOptions, Query, QueryResult, Record, Value};
