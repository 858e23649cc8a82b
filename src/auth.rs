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

//! Credentials forwarded with every request.

use crate::error::{Error, Result};
use reqwest::header::{HeaderName, HeaderValue};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "Api-Key";

/// Supplies the authentication header, if any.
pub trait AuthProvider: Send + Sync + std::fmt::Debug {
    fn auth_header(&self) -> Result<Option<(HeaderName, HeaderValue)>>;
}

/// Anonymous access.
#[derive(Debug, Clone, Default)]
pub struct NoAuth;

impl AuthProvider for NoAuth {
    fn auth_header(&self) -> Result<Option<(HeaderName, HeaderValue)>> {
        Ok(None)
    }
}

/// Static API key sent as the `Api-Key` header.
#[derive(Clone)]
pub struct ApiKey {
    key: String,
}

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey").field("key", &"<redacted>").finish()
    }
}

impl AuthProvider for ApiKey {
    fn auth_header(&self) -> Result<Option<(HeaderName, HeaderValue)>> {
        let mut value = HeaderValue::from_str(&self.key)
            .map_err(|e| Error::Configuration(format!("invalid API key: {}", e)))?;
        value.set_sensitive(true);
        Ok(Some((HeaderName::from_static("api-key"), value)))
    }
}
