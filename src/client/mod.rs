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

//! Client for the query service.
//!
//! This module provides:
//! - `QueryExecutor` trait: the two operations query builders depend on
//! - `Client`: the production implementation over HTTP
//! - `FetchExecutor` / `LiveExecutor`: the single-shot and streaming paths
//! - `QueryHttpClient`: low-level transport shared by both paths

pub mod fetch;
pub mod http;
pub mod live;
pub mod retry;

use crate::auth::{ApiKey, AuthProvider, NoAuth};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::logging::init_logging;
use crate::telemetry::{EventKind, EventReceiver, EventSink};
use crate::types::{FetchOptions, LiveOptions, Query, QueryResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub use fetch::FetchExecutor;
pub use http::{HttpClientConfig, QueryHttpClient};
pub use live::{LiveExecutor, LiveSession, LiveStream};
pub use retry::{is_retryable_status, RetryPolicy};

/// The operations a query builder needs from a backend.
#[async_trait]
pub trait QueryExecutor: Send + Sync + std::fmt::Debug {
    /// Run `query` once and return its decoded rows.
    async fn fetch(&self, query: &Query, options: FetchOptions) -> Result<QueryResult>;

    /// Follow `query` as new rows arrive.
    fn live(&self, query: &Query, options: LiveOptions) -> LiveStream;
}

/// Query service client.
///
/// Cloning is cheap and clones share the connection pool and event sink.
/// Concurrent calls each get their own retry state and instance id.
#[derive(Debug, Clone)]
pub struct Client {
    fetch_executor: FetchExecutor,
    live_executor: LiveExecutor,
    events: EventSink,
}

impl Client {
    /// Build a client from `config`. Installs logging on first use.
    pub fn new(config: ClientConfig) -> Result<Self> {
        init_logging(&config.log);

        let auth: Arc<dyn AuthProvider> = match config.api_key {
            Some(ref key) => Arc::new(ApiKey::new(key.clone())),
            None => Arc::new(NoAuth),
        };
        let http = Arc::new(QueryHttpClient::new(
            config.base_url.clone(),
            config.http_config(),
            auth,
        )?);
        let events = EventSink::default();

        debug!("Created client for {}", http.base_url());

        Ok(Self {
            fetch_executor: FetchExecutor::new(Arc::clone(&http), events.clone(), config.retry),
            live_executor: LiveExecutor::new(http, events.clone(), config.retry),
            events,
        })
    }

    /// Run `query` once, retrying transient failures.
    pub async fn fetch(&self, query: &Query, options: FetchOptions) -> Result<QueryResult> {
        self.fetch_executor.execute(query, options).await
    }

    /// Stream `query` from its cursor onward, reconnecting on transient
    /// failures. The stream ends silently when `options.cancel` fires.
    pub fn live(&self, query: &Query, options: LiveOptions) -> LiveStream {
        self.live_executor.stream(query.clone(), options)
    }

    /// The client's event sink.
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Receive every event from every call.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Receive events of one kind.
    pub fn subscribe_to(&self, kind: EventKind) -> EventReceiver {
        self.events.subscribe_to(kind)
    }
}

#[async_trait]
impl QueryExecutor for Client {
    async fn fetch(&self, query: &Query, options: FetchOptions) -> Result<QueryResult> {
        Client::fetch(self, query, options).await
    }

    fn live(&self, query: &Query, options: LiveOptions) -> LiveStream {
        Client::live(self, query, options)
    }
}
