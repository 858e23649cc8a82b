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

//! Retry classification and backoff, shared by the fetch and live paths.
//!
//! | Error | Retried |
//! |---|---|
//! | HTTP 408 / 429 / 5xx | Yes |
//! | Streamed `server` error | Yes |
//! | Transport failure (connect, timeout, body read) | Yes |
//! | Other HTTP status, `client` error, decode error, cancellation | No |

use crate::error::{Error, StreamErrorKind};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Exponential backoff with a cap and no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry; doubles on each attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    /// Whether `error` is transient.
    pub fn should_retry(error: &Error) -> bool {
        match error {
            Error::Request { status, .. } => is_retryable_status(*status),
            Error::StreamProtocol { kind, .. } => *kind == StreamErrorKind::Server,
            Error::Transport { .. } => true,
            Error::Decode { .. }
            | Error::Cancelled
            | Error::EmptyResponse
            | Error::MaxRetries
            | Error::InvalidOption { .. }
            | Error::Configuration(_) => false,
        }
    }

    /// Delay before retrying after failed attempt `attempt` (1-based):
    /// `min(base * 2^(attempt - 1), max)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Sleep for the backoff of `attempt`. Returns `false` if cancelled first.
    pub async fn wait(&self, attempt: u32, cancel: &CancellationToken) -> bool {
        let delay = self.backoff(attempt);
        debug!("Waiting {:?} before retry (attempt {})", delay, attempt);
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

/// 408, 429, and every 5xx.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || status >= 500
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_error(status: u16) -> Error {
        Error::Request {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(
                RetryPolicy::should_retry(&request_error(status)),
                "{}",
                status
            );
        }
        for status in [400, 401, 403, 404, 422] {
            assert!(
                !RetryPolicy::should_retry(&request_error(status)),
                "{}",
                status
            );
        }
    }

    #[test]
    fn test_stream_errors() {
        assert!(RetryPolicy::should_retry(&Error::StreamProtocol {
            kind: StreamErrorKind::Server,
            message: "restart".into(),
        }));
        assert!(!RetryPolicy::should_retry(&Error::StreamProtocol {
            kind: StreamErrorKind::Client,
            message: "bad query".into(),
        }));
    }

    #[test]
    fn test_terminal_errors() {
        assert!(!RetryPolicy::should_retry(&Error::Cancelled));
        assert!(!RetryPolicy::should_retry(&Error::decode("bad")));
        assert!(!RetryPolicy::should_retry(&Error::EmptyResponse));
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(8), Duration::from_millis(25_600));
        assert_eq!(policy.backoff(9), Duration::from_millis(30_000));
        assert_eq!(policy.backoff(50), Duration::from_millis(30_000));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn test_backoff_attempt_zero_uses_base() {
        assert_eq!(
            RetryPolicy::default().backoff(0),
            Duration::from_millis(200)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_sleeps_backoff() {
        let policy = RetryPolicy::default();
        let start = tokio::time::Instant::now();
        assert!(policy.wait(2, &CancellationToken::new()).await);
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_wait_is_cancellable() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!policy.wait(1, &cancel).await);
    }
}
