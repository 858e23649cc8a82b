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

//! Incremental decoding of `text/event-stream` bodies.
//!
//! [`SseFrameDecoder`] is a push/pull accumulator: byte chunks of any size
//! are pushed in, and decoded `data:` payloads are pulled out once their frame
//! is complete. [`FrameStream`] drives a decoder over a response body and owns
//! that body, so dropping or closing it releases the connection.
//!
//! ```text
//! chunk ─► buffer ─► split at last "\n\n" ─► frames ─► data: lines ─► JSON
//!            ▲                                  │
//!            └──────── partial frame ◄──────────┘
//! ```

use crate::error::{Error, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const FRAME_SEPARATOR: &[u8] = b"\n\n";
const DATA_PREFIX: &str = "data:";

/// Response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Buffers byte chunks and yields the JSON payload of each `data:` line.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: Vec<u8>,
    ready: VecDeque<Result<JsonValue>>,
    failed: bool,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and decode every frame it completes.
    ///
    /// After the first malformed payload the decoder is poisoned: the error
    /// is queued behind the payloads that preceded it and later input is
    /// ignored.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.failed {
            return;
        }
        self.buffer.extend_from_slice(chunk);

        let Some(boundary) = self
            .buffer
            .windows(FRAME_SEPARATOR.len())
            .rposition(|window| window == FRAME_SEPARATOR)
        else {
            return;
        };

        let complete: Vec<u8> = self
            .buffer
            .drain(..boundary + FRAME_SEPARATOR.len())
            .collect();
        trace!(
            "Flushing {} bytes of complete frames, {} bytes buffered",
            complete.len(),
            self.buffer.len()
        );

        // Complete frames end on an ASCII separator, so no character is split.
        let text = match std::str::from_utf8(&complete) {
            Ok(text) => text,
            Err(e) => {
                self.fail(Error::decode(format!("event stream is not valid UTF-8: {}", e)));
                return;
            }
        };

        for frame in text.split("\n\n") {
            for line in frame.lines() {
                let Some(data) = line.strip_prefix(DATA_PREFIX) else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() {
                    continue;
                }
                match serde_json::from_str(data) {
                    Ok(value) => self.ready.push_back(Ok(value)),
                    Err(e) => {
                        self.fail(Error::decode_json(
                            format!("invalid JSON in event stream frame: {}", data),
                            e,
                        ));
                        return;
                    }
                }
            }
        }
    }

    fn fail(&mut self, error: Error) {
        self.failed = true;
        self.buffer.clear();
        self.ready.push_back(Err(error));
    }

    /// Next decoded payload, in line order.
    pub fn next_payload(&mut self) -> Option<Result<JsonValue>> {
        self.ready.pop_front()
    }

    /// Bytes held back as an incomplete frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }
}

/// Pull-based payload reader over one response body.
pub struct FrameStream {
    body: Option<ByteStream>,
    decoder: SseFrameDecoder,
    cancel: CancellationToken,
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("open", &self.body.is_some())
            .field("decoder", &self.decoder)
            .finish()
    }
}

impl FrameStream {
    pub fn new(body: ByteStream, cancel: CancellationToken) -> Self {
        Self {
            body: Some(body),
            decoder: SseFrameDecoder::new(),
            cancel,
        }
    }

    /// Next payload; `None` once the body ends.
    ///
    /// A decode error or transport error closes the body before it is
    /// returned. Cancellation while waiting for bytes yields
    /// [`Error::Cancelled`].
    pub async fn next(&mut self) -> Option<Result<JsonValue>> {
        loop {
            if let Some(item) = self.decoder.next_payload() {
                if item.is_err() {
                    self.close();
                }
                return Some(item);
            }

            let body = self.body.as_mut()?;
            let chunk = tokio::select! {
                _ = self.cancel.cancelled() => None,
                chunk = body.next() => Some(chunk),
            };

            match chunk {
                None => {
                    debug!("Event stream cancelled while waiting for data");
                    self.close();
                    return Some(Err(Error::Cancelled));
                }
                Some(Some(Ok(bytes))) => self.decoder.push(&bytes),
                Some(Some(Err(e))) => {
                    self.close();
                    return Some(Err(e));
                }
                Some(None) => {
                    if self.decoder.buffered_len() > 0 {
                        debug!(
                            "Event stream ended with {} bytes of incomplete frame",
                            self.decoder.buffered_len()
                        );
                    }
                    self.close();
                    return None;
                }
            }
        }
    }

    /// Release the underlying body.
    pub fn close(&mut self) {
        if self.body.take().is_some() {
            trace!("Event stream body released");
        }
    }

    pub fn is_open(&self) -> bool {
        self.body.is_some()
    }

    /// Adapt into a `Stream` of payloads.
    pub fn into_stream(self) -> impl Stream<Item = Result<JsonValue>> + Send {
        futures::stream::unfold(self, |mut frames| async move {
            frames.next().await.map(|item| (item, frames))
        })
    }
}
