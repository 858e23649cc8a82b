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

//! Query requests, cursors, and per-call options.

use serde::Serialize;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Default attempt limit for single-shot queries.
pub const DEFAULT_FETCH_RETRY_LIMIT: u32 = 5;

/// Default attempt limit for one live session.
pub const DEFAULT_LIVE_RETRY_LIMIT: u32 = 50;

/// Resumable position in an ordered result stream.
///
/// Supplied by the caller on the first call and by the server with every
/// result afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Server-issued token, sent as-is.
    Token(String),
    /// Chain position, sent as `"<chain_id>-<block_number>"`.
    Block { chain_id: u64, block_number: u64 },
}

impl Cursor {
    /// Structured cursor for a chain position.
    pub fn block(chain_id: u64, block_number: u64) -> Self {
        Self::Block {
            chain_id,
            block_number,
        }
    }

    /// Parse a cursor string, recognising the `"<chain>-<block>"` shape.
    ///
    /// Anything else is kept as an opaque token.
    pub fn parse(value: &str) -> Self {
        value
            .split_once('-')
            .and_then(|(chain, block)| {
                let chain_id = chain.parse().ok()?;
                let block_number = block.parse().ok()?;
                Some(Self::block(chain_id, block_number))
            })
            .unwrap_or_else(|| Self::Token(value.to_string()))
    }

    /// The form sent to the server.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => f.write_str(token),
            Self::Block {
                chain_id,
                block_number,
            } => write!(f, "{}-{}", chain_id, block_number),
        }
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self::Token(value.to_string())
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self::Token(value)
    }
}

/// One logical query request. The text is opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub signatures: Vec<String>,
    pub cursor: Option<Cursor>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            signatures: Vec::new(),
            cursor: None,
        }
    }

    /// Add one `function ...` or `event ...` signature.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signatures.push(signature.into());
        self
    }

    pub fn with_signatures<I, S>(mut self, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signatures
            .extend(signatures.into_iter().map(Into::into));
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<Cursor>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// Body element of the single-shot endpoint (sent as a one-element array).
#[derive(Debug, Clone, Serialize)]
pub(crate) struct QueryRequestBody<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signatures: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl<'a> QueryRequestBody<'a> {
    pub fn from_query(query: &'a Query) -> Self {
        Self {
            query: &query.text,
            signatures: (!query.signatures.is_empty()).then_some(query.signatures.as_slice()),
            cursor: query.cursor.as_ref().map(Cursor::to_wire),
        }
    }
}

/// Options for [`Client::fetch`](crate::Client::fetch).
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum number of attempts, including the first.
    pub retry_limit: u32,
    /// Cancels the in-flight exchange or backoff sleep.
    pub cancel: CancellationToken,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_FETCH_RETRY_LIMIT,
            cancel: CancellationToken::new(),
        }
    }
}

impl FetchOptions {
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Options for [`Client::live`](crate::Client::live).
#[derive(Debug, Clone)]
pub struct LiveOptions {
    /// Consecutive failed connection attempts tolerated before giving up.
    pub retry_limit: u32,
    /// Ends the stream silently when triggered.
    pub cancel: CancellationToken,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_LIVE_RETRY_LIMIT,
            cancel: CancellationToken::new(),
        }
    }
}

impl LiveOptions {
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
