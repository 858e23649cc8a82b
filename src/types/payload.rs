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

//! Wire payloads returned by the query endpoints.
//!
//! These types map directly to the JSON produced by the server. Rows stay
//! untyped here; [`RowNormalizer`](crate::decode::RowNormalizer) turns them
//! into records.

use crate::error::{Error, Result, StreamErrorKind};
use serde::Deserialize;

/// Column metadata for a result set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Source type tag reported by the server (Postgres type name).
    #[serde(rename = "pgtype", default)]
    pub source_type: String,
}

/// One untyped result set. `rows[i][j]` belongs to `columns[j]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPayload {
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    pub cursor: String,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Error body returned with a non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

/// One decoded `data:` payload from the live endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveFrame {
    /// Result batches, in server order.
    Batches(Vec<RawPayload>),
    /// Tagged `{error, message}` object.
    Error {
        kind: StreamErrorKind,
        message: String,
    },
}

impl LiveFrame {
    /// Classify a decoded frame payload.
    ///
    /// Objects with an `error` member are protocol errors; everything else
    /// must be an array of result payloads.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if let Some(tag) = value.get("error") {
            let kind = StreamErrorKind::from_tag(tag.as_str().unwrap_or_default());
            let message = value
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown stream error")
                .to_string();
            return Ok(Self::Error { kind, message });
        }

        let batches = serde_json::from_value(value)
            .map_err(|e| Error::decode_json("invalid live result payload", e))?;
        Ok(Self::Batches(batches))
    }

    /// The frame's batches, or the protocol error an error frame carries.
    pub fn into_batches(self) -> Result<Vec<RawPayload>> {
        match self {
            Self::Batches(batches) => Ok(batches),
            Self::Error { kind, message } => Err(Error::StreamProtocol { kind, message }),
        }
    }
}
