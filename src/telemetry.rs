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

//! Observability events.
//!
//! Every `fetch` and `live` call gets a [`CallScope`] with a fresh instance
//! id. The scope publishes request, response, error, and log events on the
//! client's [`EventSink`], a broadcast channel owned by the client value.
//! Subscribers either receive everything ([`EventSink::subscribe`]) or one
//! kind ([`EventSink::subscribe_to`]).

use crate::auth::API_KEY_HEADER;
use crate::client::RetryPolicy;
use crate::error::Error;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use tokio::sync::broadcast;
use tracing::{trace, warn};
use uuid::Uuid;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// The four event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Request,
    Response,
    Error,
    Log,
}

/// Outbound request, captured before it is sent.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl RequestSnapshot {
    pub fn from_request(request: &reqwest::Request) -> Self {
        Self {
            method: request.method().to_string(),
            url: request.url().to_string(),
            headers: snapshot_headers(request.headers()),
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(Bytes::copy_from_slice),
        }
    }
}

/// Inbound response head, captured before the body is read.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseSnapshot {
    pub fn from_response(response: &reqwest::Response) -> Self {
        Self {
            status: response.status().as_u16(),
            url: response.url().to_string(),
            headers: snapshot_headers(response.headers()),
        }
    }
}

/// Error observed by a call, with its retry decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub message: String,
    pub status: Option<u16>,
    pub retryable: bool,
    /// 1-based attempt on which the error happened.
    pub attempt: u32,
}

impl ErrorReport {
    pub fn new(error: &Error, attempt: u32) -> Self {
        Self {
            message: error.to_string(),
            status: error.status(),
            retryable: RetryPolicy::should_retry(error),
            attempt,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Request(RequestSnapshot),
    Response(ResponseSnapshot),
    Error(ErrorReport),
    Log(String),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Request(_) => EventKind::Request,
            Self::Response(_) => EventKind::Response,
            Self::Error(_) => EventKind::Error,
            Self::Log(_) => EventKind::Log,
        }
    }
}

/// One published event, attributed to the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub instance_id: Uuid,
    pub payload: EventPayload,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// Multi-subscriber event bus. Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: broadcast::Sender<Event>,
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            inner: self.sender.subscribe(),
            kind: None,
        }
    }

    /// Receive only events of `kind`.
    pub fn subscribe_to(&self, kind: EventKind) -> EventReceiver {
        EventReceiver {
            inner: self.sender.subscribe(),
            kind: Some(kind),
        }
    }

    /// Publish an event. Events with no subscribers are dropped.
    pub fn emit(&self, event: Event) {
        trace!(
            "Emitting {:?} event for instance {}",
            event.kind(),
            event.instance_id
        );
        let _ = self.sender.send(event);
    }

    /// Open a scope with a new instance id for one call.
    pub fn scope(&self) -> CallScope {
        CallScope {
            id: Uuid::new_v4(),
            sink: self.clone(),
        }
    }
}

/// Subscription handle returned by [`EventSink`].
#[derive(Debug)]
pub struct EventReceiver {
    inner: broadcast::Receiver<Event>,
    kind: Option<EventKind>,
}

impl EventReceiver {
    fn accepts(&self, event: &Event) -> bool {
        self.kind.map_or(true, |kind| event.kind() == kind)
    }

    /// Wait for the next matching event. `None` once the sink is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.inner.recv().await {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already buffered, without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.inner.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(_) => return None,
            }
        }
    }

    /// Every matching event already buffered.
    pub fn drain(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Per-call emitter carrying the call's instance id.
#[derive(Debug, Clone)]
pub struct CallScope {
    id: Uuid,
    sink: EventSink,
}

impl CallScope {
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn emit(&self, payload: EventPayload) {
        self.sink.emit(Event {
            instance_id: self.id,
            payload,
        });
    }

    pub fn request(&self, request: &reqwest::Request) {
        self.emit(EventPayload::Request(RequestSnapshot::from_request(request)));
    }

    pub fn response(&self, response: &reqwest::Response) {
        self.emit(EventPayload::Response(ResponseSnapshot::from_response(
            response,
        )));
    }

    pub fn error(&self, error: &Error, attempt: u32) {
        self.emit(EventPayload::Error(ErrorReport::new(error, attempt)));
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(EventPayload::Log(message.into()));
    }
}

fn snapshot_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name.as_str().eq_ignore_ascii_case(API_KEY_HEADER) {
                "<redacted>".to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_and_filtered_subscribers() {
        let sink = EventSink::default();
        let mut all = sink.subscribe();
        let mut errors = sink.subscribe_to(EventKind::Error);

        let scope = sink.scope();
        scope.log("connecting");
        scope.error(
            &Error::Request {
                status: 503,
                message: "busy".into(),
            },
            1,
        );

        let events = all.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), EventKind::Log);
        assert!(events.iter().all(|e| e.instance_id == scope.id()));

        let only_errors = errors.drain();
        assert_eq!(only_errors.len(), 1);
        match &only_errors[0].payload {
            EventPayload::Error(report) => {
                assert_eq!(report.status, Some(503));
                assert!(report.retryable);
                assert_eq!(report.attempt, 1);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_scopes_get_distinct_ids() {
        let sink = EventSink::default();
        assert_ne!(sink.scope().id(), sink.scope().id());
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let sink = EventSink::new(4);
        sink.scope().log("nobody listening");
    }

    #[test]
    fn test_lagging_subscriber_keeps_receiving() {
        let sink = EventSink::new(2);
        let mut rx = sink.subscribe();
        let scope = sink.scope();
        for i in 0..5 {
            scope.log(format!("event {}", i));
        }
        let events = rx.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].payload, EventPayload::Log("event 4".to_string()));
    }

    #[test]
    fn test_request_snapshot_redacts_api_key() {
        let client = reqwest::Client::new();
        let request = client
            .post("https://example.com/query")
            .header(API_KEY_HEADER, "secret")
            .header("Content-Type", "application/json")
            .body("[]")
            .build()
            .unwrap();

        let snapshot = RequestSnapshot::from_request(&request);
        assert_eq!(snapshot.method, "POST");
        assert_eq!(snapshot.url, "https://example.com/query");
        assert_eq!(snapshot.body.as_deref(), Some(&b"[]"[..]));
        assert!(snapshot
            .headers
            .iter()
            .any(|(name, value)| name == "api-key" && value == "<redacted>"));
    }
}
