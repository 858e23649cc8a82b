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

//! Crate logging over `tracing-subscriber`.
//!
//! The first [`Client::new`](crate::Client::new) installs a subscriber
//! writing to stderr or to `chainquery.log_file`. The level filter sits
//! behind a reload handle, so a later client with an explicit
//! `chainquery.log_level` changes the level in place. The destination is
//! fixed by the first client.
//!
//! Level priority for the installed filter:
//! 1. `chainquery.log_level`
//! 2. `RUST_LOG`
//! 3. `chainquery_client=warn`

use std::sync::OnceLock;
use tracing::warn;
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

const DEFAULT_DIRECTIVE: &str = "chainquery_client=warn";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// `None` when nothing was installed: level `off` on the first client, an
/// unopenable log file, or a subscriber the application set up itself.
static FILTER_HANDLE: OnceLock<Option<FilterHandle>> = OnceLock::new();

/// Logging settings carried by [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// "off", "error", "warn", "info", "debug" or "trace", any case.
    pub level: Option<String>,
    /// Log file path. If unset, logs go to stderr.
    pub file: Option<String>,
}

fn filter_for(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(format!("chainquery_client={}", level.to_lowercase())),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

/// Install logging on the first call; apply the level of later calls that
/// set one.
pub(crate) fn init_logging(config: &LogConfig) {
    let mut first = false;
    let handle = FILTER_HANDLE.get_or_init(|| {
        first = true;
        install(config)
    });
    if first {
        return;
    }

    if let (Some(handle), Some(level)) = (handle, config.level.as_deref()) {
        if let Err(e) = handle.modify(|filter| *filter = filter_for(Some(level))) {
            warn!("Failed to change log level to {}: {}", level, e);
        }
    }
}

fn install(config: &LogConfig) -> Option<FilterHandle> {
    let level = config.level.as_deref();
    if level.is_some_and(|l| l.eq_ignore_ascii_case("off")) {
        return None;
    }

    let (filter, handle) = reload::Layer::new(filter_for(level));
    let installed = match config.file {
        Some(ref path) => {
            let file = match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
            {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("chainquery-client: failed to open log file {}: {}", path, e);
                    return None;
                }
            };
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(file)
                        .with_target(false)
                        .with_ansi(false)
                        .with_timer(SystemTime),
                )
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_timer(SystemTime),
            )
            .try_init(),
    };

    installed.ok().map(|_| handle)
}
