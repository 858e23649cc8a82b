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

//! Streaming execution against `GET /query-live`.
//!
//! A live call is a [`LiveSession`] driven as a `Stream`:
//!
//! ```text
//! Connecting ──ok──▶ Streaming ──end──▶ Done
//!     ▲                  │
//!     │             retryable error
//!     │                  ▼
//!     └──── sleep ── BackingOff       terminal error ──▶ Done (error yielded)
//! ```
//!
//! The session remembers the cursor of the last batch it yielded and sends
//! it on every reconnect. The server decides where to resume; redelivery
//! around the cursor is passed through unchanged.

use crate::client::http::QueryHttpClient;
use crate::client::retry::RetryPolicy;
use crate::decode::RowNormalizer;
use crate::error::{Error, Result};
use crate::reader::FrameStream;
use crate::telemetry::{CallScope, EventSink};
use crate::types::{Cursor, LiveFrame, LiveOptions, Query, QueryResult, RawPayload};
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Lazy sequence of result batches returned by a live call.
pub type LiveStream = Pin<Box<dyn Stream<Item = Result<QueryResult>> + Send>>;

/// Opens live sessions.
#[derive(Debug, Clone)]
pub struct LiveExecutor {
    http: Arc<QueryHttpClient>,
    events: EventSink,
    retry: RetryPolicy,
}

impl LiveExecutor {
    pub fn new(http: Arc<QueryHttpClient>, events: EventSink, retry: RetryPolicy) -> Self {
        Self {
            http,
            events,
            retry,
        }
    }

    /// Start a session for `query`. Nothing is sent until the stream is polled.
    pub fn stream(&self, query: Query, options: LiveOptions) -> LiveStream {
        let session = LiveSession::new(
            Arc::clone(&self.http),
            self.events.scope(),
            self.retry,
            query,
            options,
        );
        Box::pin(session.into_stream().fuse())
    }
}

enum SessionState {
    Connecting,
    Streaming(FrameStream),
    BackingOff,
    Done,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => f.write_str("Connecting"),
            Self::Streaming(_) => f.write_str("Streaming"),
            Self::BackingOff => f.write_str("BackingOff"),
            Self::Done => f.write_str("Done"),
        }
    }
}

/// State of one live call.
#[derive(Debug)]
pub struct LiveSession {
    http: Arc<QueryHttpClient>,
    scope: CallScope,
    retry: RetryPolicy,
    query: Query,
    normalizer: RowNormalizer,
    cancel: CancellationToken,
    retry_limit: u32,
    /// Cursor of the last yielded batch, or the caller's starting cursor.
    cursor: Option<String>,
    /// Consecutive failures since the last yielded batch.
    attempt: u32,
    pending: VecDeque<RawPayload>,
    state: SessionState,
}

impl LiveSession {
    pub fn new(
        http: Arc<QueryHttpClient>,
        scope: CallScope,
        retry: RetryPolicy,
        query: Query,
        options: LiveOptions,
    ) -> Self {
        Self {
            http,
            scope,
            retry,
            normalizer: RowNormalizer::for_query(&query),
            cursor: query.cursor.as_ref().map(Cursor::to_wire),
            query,
            cancel: options.cancel,
            retry_limit: options.retry_limit,
            attempt: 0,
            pending: VecDeque::new(),
            state: SessionState::Connecting,
        }
    }

    /// Cursor that the next reconnect would resume from.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Next non-empty batch. `None` when the stream ends or is cancelled;
    /// a terminal error is yielded once and then the session is done.
    pub async fn next(&mut self) -> Option<Result<QueryResult>> {
        loop {
            if self.cancel.is_cancelled() {
                if !matches!(self.state, SessionState::Done) {
                    self.stop_cancelled();
                }
                return None;
            }

            if let Some(raw) = self.pending.pop_front() {
                if raw.rows.is_empty() {
                    continue;
                }
                match self.normalizer.normalize(raw, &self.query) {
                    Ok(result) => {
                        self.cursor = Some(result.cursor.clone());
                        self.attempt = 0;
                        return Some(Ok(result));
                    }
                    Err(e) => match self.fail(e) {
                        Some(e) => return Some(Err(e)),
                        None => continue,
                    },
                }
            }

            match std::mem::replace(&mut self.state, SessionState::Done) {
                SessionState::Done => return None,
                SessionState::Connecting => match Self::connect(
                    &self.http,
                    &self.scope,
                    &self.query,
                    self.cursor.as_deref(),
                    &self.cancel,
                )
                .await
                {
                    Ok(frames) => self.state = SessionState::Streaming(frames),
                    Err(e) => {
                        if let Some(e) = self.fail(e) {
                            return Some(Err(e));
                        }
                    }
                },
                SessionState::Streaming(mut frames) => match frames.next().await {
                    None => {
                        debug!("Live session {} ended", self.scope.id());
                        self.scope.log("live stream ended");
                        return None;
                    }
                    Some(Ok(payload)) => match LiveFrame::from_json(payload)
                        .and_then(LiveFrame::into_batches)
                    {
                        Ok(batches) => {
                            self.pending.extend(batches);
                            self.state = SessionState::Streaming(frames);
                        }
                        Err(e) => {
                            frames.close();
                            if let Some(e) = self.fail(e) {
                                return Some(Err(e));
                            }
                        }
                    },
                    Some(Err(e)) => {
                        if let Some(e) = self.fail(e) {
                            return Some(Err(e));
                        }
                    }
                },
                SessionState::BackingOff => {
                    if !self.retry.wait(self.attempt, &self.cancel).await {
                        self.stop_cancelled();
                        return None;
                    }
                    let message = format!(
                        "reconnecting (attempt {}) from cursor {}",
                        self.attempt + 1,
                        self.cursor.as_deref().unwrap_or("<none>")
                    );
                    debug!("Live session {} {}", self.scope.id(), message);
                    self.scope.log(message);
                    self.state = SessionState::Connecting;
                }
            }
        }
    }

    // Takes fields rather than `&self`: an open `FrameStream` is not `Sync`.
    async fn connect(
        http: &QueryHttpClient,
        scope: &CallScope,
        query: &Query,
        cursor: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<FrameStream> {
        let request = http.live_request(query, cursor)?;
        scope.request(&request);
        let response = http.send(request, cancel).await?;
        scope.response(&response);

        let response = QueryHttpClient::check_status(response, cancel).await?;
        Ok(FrameStream::new(
            QueryHttpClient::body_stream(response),
            cancel.clone(),
        ))
    }

    /// Record a failure and pick the next state. Returns the error if the
    /// session must surface it and stop.
    fn fail(&mut self, e: Error) -> Option<Error> {
        self.pending.clear();

        if e.is_cancelled() {
            self.stop_cancelled();
            return None;
        }

        self.attempt += 1;
        self.scope.error(&e, self.attempt);

        if RetryPolicy::should_retry(&e) && self.attempt < self.retry_limit {
            warn!(
                "Live session {} failed (attempt {}/{}), backing off: {}",
                self.scope.id(),
                self.attempt,
                self.retry_limit,
                e
            );
            self.state = SessionState::BackingOff;
            None
        } else {
            error!(
                "Live session {} failed after {} attempt(s): {}",
                self.scope.id(),
                self.attempt,
                e
            );
            self.state = SessionState::Done;
            Some(e)
        }
    }

    /// Callers have already taken the state, so this always logs.
    fn stop_cancelled(&mut self) {
        debug!("Live session {} cancelled", self.scope.id());
        self.scope.log("live stream cancelled");
        self.pending.clear();
        self.state = SessionState::Done;
    }

    /// Adapt into a `Stream` of batches.
    pub fn into_stream(self) -> impl Stream<Item = Result<QueryResult>> + Send {
        futures::stream::unfold(self, |mut session| async move {
            session.next().await.map(|item| (item, session))
        })
    }
}
