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

//! Error types for the query client.
//!
//! Every failure the engine can raise is one variant of [`Error`]. The
//! variants double as the classification consumed by
//! [`RetryPolicy`](crate::client::RetryPolicy): HTTP status, stream error
//! kind, and transport failures decide whether an exchange is retried.

use std::fmt;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Which side of the exchange a streamed error frame blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// The request itself is invalid. Never retried.
    Client,
    /// The server failed while streaming. Retried.
    Server,
}

impl StreamErrorKind {
    /// Parse the `error` tag of a streamed error frame.
    ///
    /// Anything other than `"server"` is treated as a client fault, so an
    /// unknown tag never causes an endless reconnect loop.
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("server") {
            Self::Server
        } else {
            Self::Client
        }
    }
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("client"),
            Self::Server => f.write_str("server"),
        }
    }
}

/// Errors raised by the query client.
#[derive(Debug, Error)]
pub enum Error {
    /// The endpoint answered with a non-2xx status.
    #[error("request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    /// The live endpoint sent a tagged `{error, message}` frame.
    #[error("{kind} stream error: {message}")]
    StreamProtocol {
        kind: StreamErrorKind,
        message: String,
    },

    /// A value or frame violated the data contract.
    #[error("decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The request never produced a response (connect, timeout, body read).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    /// The query endpoint answered with an empty result list.
    #[error("response contained no result payloads")]
    EmptyResponse,

    /// The retry loop ran out of attempts without capturing an error.
    #[error("maximum retries reached")]
    MaxRetries,

    /// A configuration option key or value was rejected.
    #[error("invalid option {key}={value}")]
    InvalidOption { key: String, value: String },

    /// The client could not be constructed from its configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Build a decode error without an underlying cause.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
            source: None,
        }
    }

    /// Build a decode error that wraps a JSON parse failure.
    pub fn decode_json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Build a transport error from a `reqwest` failure.
    pub fn transport(context: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            message: format!("{}: {}", context, source),
            source,
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the caller asked for the operation to stop.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
