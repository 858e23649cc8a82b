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

//! HTTP transport for the query endpoints.
//!
//! This module provides a thin client over `reqwest` with:
//! - Connection pooling
//! - Request building for `POST /query` and `GET /query-live`
//! - API key header injection
//! - Cancellable sends and HTTP error extraction
//!
//! Retries live in the executors, not here.

use crate::auth::AuthProvider;
use crate::error::{Error, Result};
use crate::reader::ByteStream;
use crate::types::payload::ErrorBody;
use crate::types::query::QueryRequestBody;
use crate::types::Query;
use futures::StreamExt;
use reqwest::{Client, Method, Request, Response, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Path of the single-shot endpoint.
pub const QUERY_PATH: &str = "/query";
/// Path of the streaming endpoint.
pub const LIVE_PATH: &str = "/query-live";

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Whole-exchange timeout for single-shot queries. Live streams are
    /// open-ended and never time out.
    pub read_timeout: Option<Duration>,
    /// Maximum number of idle connections per host.
    pub max_connections_per_host: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: None,
            max_connections_per_host: 32,
            user_agent: format!("chainquery-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client bound to one service base URL.
#[derive(Debug)]
pub struct QueryHttpClient {
    client: Client,
    base_url: String,
    config: HttpClientConfig,
    auth_provider: Arc<dyn AuthProvider>,
}

impl QueryHttpClient {
    /// Creates a new HTTP client for `base_url`, which must be an absolute
    /// `http` or `https` URL.
    pub fn new(
        base_url: impl Into<String>,
        config: HttpClientConfig,
        auth_provider: Arc<dyn AuthProvider>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .map_err(|e| Error::Configuration(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "Invalid base URL '{}': scheme must be http or https",
                base_url
            )));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            auth_provider,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_builder(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let mut builder = self.client.request(method, self.endpoint(path));
        if let Some((name, value)) = self.auth_provider.auth_header()? {
            builder = builder.header(name, value);
        }
        Ok(builder)
    }

    /// `POST /query` with a one-element JSON array body.
    ///
    /// A request that cannot be built is a configuration error, never retried.
    pub fn query_request(&self, query: &Query) -> Result<Request> {
        let body = [QueryRequestBody::from_query(query)];
        let mut builder = self
            .request_builder(Method::POST, QUERY_PATH)?
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(timeout) = self.config.read_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build query request: {}", e)))
    }

    /// `GET /query-live` with query, signatures, and cursor as parameters.
    pub fn live_request(&self, query: &Query, cursor: Option<&str>) -> Result<Request> {
        let mut params: Vec<(&str, &str)> = Vec::with_capacity(query.signatures.len() + 2);
        params.push(("query", query.text.as_str()));
        for signature in &query.signatures {
            params.push(("signatures", signature.as_str()));
        }
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor));
        }

        self.request_builder(Method::GET, LIVE_PATH)?
            .header("Accept", "text/event-stream")
            .query(&params)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build live request: {}", e)))
    }

    /// Send `request`, stopping early if `cancel` fires.
    ///
    /// Any HTTP status is returned as a response; see [`Self::check_status`].
    pub async fn send(&self, request: Request, cancel: &CancellationToken) -> Result<Response> {
        debug!("Executing {} {}", request.method(), request.url());

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = self.client.execute(request) => response,
        };

        response.map_err(|e| Error::transport("HTTP request failed", e))
    }

    /// Pass 2xx responses through; turn anything else into
    /// [`Error::Request`] carrying the server's message.
    pub async fn check_status(response: Response, cancel: &CancellationToken) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            body = response.text() => body.unwrap_or_default(),
        };

        Err(Error::Request {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    /// Read a whole response body as text.
    pub async fn read_text(response: Response, cancel: &CancellationToken) -> Result<String> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            body = response.text() => body.map_err(|e| Error::transport("Failed to read response", e)),
        }
    }

    /// The response body as a chunk stream.
    pub fn body_stream(response: Response) -> ByteStream {
        Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| Error::transport("Failed to read event stream", e))),
        )
    }
}

/// Most specific message available for a failed response: the JSON
/// `message` field, then the raw body, then the status reason.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
