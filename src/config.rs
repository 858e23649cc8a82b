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

//! Client configuration.
//!
//! Settings can be given through builder methods or as string options:
//!
//! | Key | Meaning |
//! |---|---|
//! | `chainquery.base_url` | Service URL |
//! | `chainquery.api_key` | Value of the `Api-Key` header |
//! | `chainquery.connect_timeout_ms` | TCP/TLS connect timeout |
//! | `chainquery.read_timeout_ms` | Timeout for single-shot queries, `0` disables |
//! | `chainquery.user_agent` | `User-Agent` header |
//! | `chainquery.retry.base_delay_ms` | First backoff delay |
//! | `chainquery.retry.max_delay_ms` | Backoff cap |
//! | `chainquery.log_level` | Crate log level |
//! | `chainquery.log_file` | Log file path |

use crate::client::http::HttpClientConfig;
use crate::client::RetryPolicy;
use crate::error::{Error, Result};
use crate::logging::LogConfig;
use std::time::Duration;

/// Production service URL.
pub const DEFAULT_BASE_URL: &str = "https://api.indexsupply.net";

/// Everything needed to build a [`Client`](crate::Client).
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub log: LogConfig,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .field("log", &self.log)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let http = HttpClientConfig::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            connect_timeout: http.connect_timeout,
            read_timeout: http.read_timeout,
            user_agent: http.user_agent,
            retry: RetryPolicy::default(),
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log.level = Some(level.into());
        self
    }

    pub fn with_log_file(mut self, path: impl Into<String>) -> Self {
        self.log.file = Some(path.into());
        self
    }

    /// Transport settings derived from this configuration.
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            user_agent: self.user_agent.clone(),
            ..HttpClientConfig::default()
        }
    }

    fn parse_millis(key: &str, value: &str) -> Result<Duration> {
        value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| invalid_option(key, value))
    }

    /// Set one option by key.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "chainquery.base_url" => {
                if value.trim().is_empty() {
                    return Err(invalid_option(key, value));
                }
                self.base_url = value.trim().to_string();
            }
            "chainquery.api_key" => {
                self.api_key = (!value.is_empty()).then(|| value.to_string());
            }
            "chainquery.connect_timeout_ms" => {
                self.connect_timeout = Self::parse_millis(key, value)?;
            }
            "chainquery.read_timeout_ms" => {
                let timeout = Self::parse_millis(key, value)?;
                self.read_timeout = (!timeout.is_zero()).then_some(timeout);
            }
            "chainquery.user_agent" => {
                self.user_agent = value.to_string();
            }
            "chainquery.retry.base_delay_ms" => {
                self.retry.base_delay = Self::parse_millis(key, value)?;
            }
            "chainquery.retry.max_delay_ms" => {
                self.retry.max_delay = Self::parse_millis(key, value)?;
            }
            "chainquery.log_level" => match value.to_ascii_lowercase().as_str() {
                "off" | "error" | "warn" | "info" | "debug" | "trace" => {
                    self.log.level = Some(value.to_string());
                }
                _ => return Err(invalid_option(key, value)),
            },
            "chainquery.log_file" => {
                self.log.file = (!value.is_empty()).then(|| value.to_string());
            }
            _ => return Err(invalid_option(key, value)),
        }
        Ok(())
    }

    /// Read one option back as a string. The API key is never returned.
    pub fn get_option(&self, key: &str) -> Result<String> {
        let millis = |d: Duration| d.as_millis().to_string();
        match key {
            "chainquery.base_url" => Ok(self.base_url.clone()),
            "chainquery.connect_timeout_ms" => Ok(millis(self.connect_timeout)),
            "chainquery.read_timeout_ms" => Ok(self.read_timeout.map_or("0".to_string(), millis)),
            "chainquery.user_agent" => Ok(self.user_agent.clone()),
            "chainquery.retry.base_delay_ms" => Ok(millis(self.retry.base_delay)),
            "chainquery.retry.max_delay_ms" => Ok(millis(self.retry.max_delay)),
            "chainquery.log_level" => self
                .log
                .level
                .clone()
                .ok_or_else(|| Error::Configuration(format!("option '{}' is not set", key))),
            "chainquery.log_file" => self
                .log
                .file
                .clone()
                .ok_or_else(|| Error::Configuration(format!("option '{}' is not set", key))),
            _ => Err(invalid_option(key, "")),
        }
    }

    /// Apply every `(key, value)` pair in order, stopping at the first error.
    pub fn with_options<'a, I>(mut self, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in options {
            self.set_option(key, value)?;
        }
        Ok(self)
    }
}

fn invalid_option(key: &str, value: &str) -> Error {
    Error::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.api_key.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.read_timeout.is_none());
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_set_options() {
        let config = ClientConfig::new()
            .with_options([
                ("chainquery.base_url", "http://localhost:8080"),
                ("chainquery.api_key", "secret"),
                ("chainquery.connect_timeout_ms", "1500"),
                ("chainquery.read_timeout_ms", "10000"),
                ("chainquery.retry.base_delay_ms", "5"),
                ("chainquery.retry.max_delay_ms", "50"),
                ("chainquery.log_level", "DEBUG"),
            ])
            .unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.retry.base_delay, Duration::from_millis(5));
        assert_eq!(config.retry.max_delay, Duration::from_millis(50));
        assert_eq!(config.log.level.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn test_zero_read_timeout_disables() {
        let mut config = ClientConfig::new().with_read_timeout(Duration::from_secs(1));
        config.set_option("chainquery.read_timeout_ms", "0").unwrap();
        assert!(config.read_timeout.is_none());
        assert_eq!(config.get_option("chainquery.read_timeout_ms").unwrap(), "0");
    }

    #[test]
    fn test_invalid_options() {
        let mut config = ClientConfig::default();
        for (key, value) in [
            ("chainquery.connect_timeout_ms", "soon"),
            ("chainquery.retry.base_delay_ms", "-1"),
            ("chainquery.log_level", "loud"),
            ("chainquery.base_url", " "),
            ("chainquery.unknown", "x"),
        ] {
            match config.set_option(key, value) {
                Err(Error::InvalidOption { key: k, .. }) => assert_eq!(k, key),
                other => panic!("{} accepted: {:?}", key, other),
            }
        }
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_get_option() {
        let config = ClientConfig::new().with_base_url("http://x");
        assert_eq!(config.get_option("chainquery.base_url").unwrap(), "http://x");
        assert_eq!(
            config.get_option("chainquery.retry.base_delay_ms").unwrap(),
            "200"
        );
        assert!(config.get_option("chainquery.log_file").is_err());
        assert!(config.get_option("chainquery.api_key").is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfig::new().with_api_key("hunter2");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_http_config() {
        let http = ClientConfig::new()
            .with_connect_timeout(Duration::from_secs(2))
            .with_user_agent("indexer/1")
            .http_config();
        assert_eq!(http.connect_timeout, Duration::from_secs(2));
        assert_eq!(http.user_agent, "indexer/1");
    }
}
