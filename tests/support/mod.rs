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

//! In-process mock of the query service.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;
use chainquery_client::{Client, ClientConfig, RetryPolicy};
use futures::StreamExt;
use serde_json::Value as JsonValue;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Bind `router` on an ephemeral port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    format!("http://{}", addr)
}

/// Client pointed at `base_url` with millisecond backoff.
pub fn client(base_url: &str) -> Client {
    client_with_retry(
        base_url,
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
        },
    )
}

pub fn client_with_retry(base_url: &str, retry: RetryPolicy) -> Client {
    let config = ClientConfig::default()
        .with_base_url(base_url)
        .with_api_key("test-key")
        .with_retry_policy(retry);
    Client::new(config).expect("client")
}

/// Shared request log for handlers.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    /// Count a request and return its 1-based index.
    pub fn hit(&self) -> usize {
        self.hits.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn record(&self, value: impl Into<String>) {
        self.seen.lock().unwrap().push(value.into());
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

/// One `data:` frame.
pub fn frame(payload: &JsonValue) -> String {
    format!("data: {}\n\n", payload)
}

/// Event-stream response sending `body` in `chunk_size`-byte pieces. With
/// `hold_open` the connection stays open after the last byte.
pub fn event_stream(body: String, chunk_size: usize, hold_open: bool) -> Response {
    let chunks: Vec<Result<Bytes, Infallible>> = body
        .into_bytes()
        .chunks(chunk_size.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();

    let stream = futures::stream::iter(chunks);
    let body = if hold_open {
        Body::from_stream(stream.chain(futures::stream::pending()))
    } else {
        Body::from_stream(stream)
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/event-stream")],
        body,
    )
        .into_response()
}

/// A result payload for the `blocks` table.
pub fn blocks_payload(cursor: &str, nums: &[u64]) -> JsonValue {
    let rows: Vec<JsonValue> = nums
        .iter()
        .map(|n| serde_json::json!([n, format!("0x{:064X}", n)]))
        .collect();
    serde_json::json!({
        "columns": [
            { "name": "num", "pgtype": "numeric" },
            { "name": "hash", "pgtype": "bytea" }
        ],
        "cursor": cursor,
        "rows": rows
    })
}
