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

//! Single-shot execution against `POST /query`.

use crate::client::http::QueryHttpClient;
use crate::client::retry::RetryPolicy;
use crate::decode::RowNormalizer;
use crate::error::{Error, Result};
use crate::telemetry::{CallScope, EventSink};
use crate::types::{FetchOptions, Query, QueryResult, RawPayload};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs one query to completion, retrying transient failures.
#[derive(Debug, Clone)]
pub struct FetchExecutor {
    http: Arc<QueryHttpClient>,
    events: EventSink,
    retry: RetryPolicy,
}

impl FetchExecutor {
    pub fn new(http: Arc<QueryHttpClient>, events: EventSink, retry: RetryPolicy) -> Self {
        Self {
            http,
            events,
            retry,
        }
    }

    pub fn http(&self) -> &QueryHttpClient {
        &self.http
    }

    /// Execute `query`, making at most `options.retry_limit` attempts.
    ///
    /// Every failed attempt is reported as an error event. Terminal errors
    /// are returned at once; once attempts run out the last error is
    /// returned.
    pub async fn execute(&self, query: &Query, options: FetchOptions) -> Result<QueryResult> {
        let scope = self.events.scope();
        let mut normalizer = RowNormalizer::for_query(query);
        let mut last_error = None;

        for attempt in 1..=options.retry_limit {
            debug!(
                "Fetch {} attempt {}/{}",
                scope.id(),
                attempt,
                options.retry_limit
            );

            let error = match self
                .attempt(query, &mut normalizer, &scope, &options.cancel)
                .await
            {
                Ok(result) => {
                    debug!(
                        "Fetch {} returned {} rows at cursor {}",
                        scope.id(),
                        result.rows.len(),
                        result.cursor
                    );
                    return Ok(result);
                }
                Err(error) => error,
            };

            scope.error(&error, attempt);
            if !RetryPolicy::should_retry(&error) {
                debug!("Fetch {} failed with terminal error: {}", scope.id(), error);
                return Err(error);
            }

            warn!(
                "Fetch {} attempt {} failed, retrying: {}",
                scope.id(),
                attempt,
                error
            );
            if attempt < options.retry_limit && !self.retry.wait(attempt, &options.cancel).await {
                return Err(Error::Cancelled);
            }
            last_error = Some(error);
        }

        Err(last_error.unwrap_or(Error::MaxRetries))
    }

    async fn attempt(
        &self,
        query: &Query,
        normalizer: &mut RowNormalizer,
        scope: &CallScope,
        cancel: &CancellationToken,
    ) -> Result<QueryResult> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let request = self.http.query_request(query)?;
        scope.request(&request);
        let response = self.http.send(request, cancel).await?;
        scope.response(&response);

        let response = QueryHttpClient::check_status(response, cancel).await?;
        let body = QueryHttpClient::read_text(response, cancel).await?;

        let payloads: Vec<RawPayload> = serde_json::from_str(&body)
            .map_err(|e| Error::decode_json("invalid query response", e))?;
        let raw = payloads.into_iter().next().ok_or(Error::EmptyResponse)?;

        normalizer.normalize(raw, query)
    }
}
