//! Client configuration: socket endpoint and reconnect policy.
//!
//! DESIGN
//! ======
//! Defaults target a local backend. Native hosts override them from the
//! environment; the browser build derives the base URL from
//! `window.location` instead.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use frames::PayloadField;

pub const DEFAULT_BASE_URL: &str = "ws://localhost:8080";
pub const DEFAULT_WS_PATH: &str = "/api/v1/ws";
pub const DEFAULT_CHANNEL_NAME: &str = "General";
pub const DEFAULT_RECONNECT_INITIAL_MS: u64 = 1000;
pub const DEFAULT_RECONNECT_MAX_MS: u64 = 10_000;
pub const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 5;

/// Capped exponential backoff with a finite retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
    /// Retries allowed per reconnect cycle before settling in `error`.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: DEFAULT_RECONNECT_INITIAL_MS,
            max_delay_ms: DEFAULT_RECONNECT_MAX_MS,
            max_attempts: DEFAULT_RECONNECT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based).
    ///
    /// `min(initial * 2^(attempt - 1), max)`; attempt 0 is treated as 1.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = 1_u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let delay = self.initial_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Whether retry number `attempt` (1-based) is still within budget.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        attempt <= self.max_attempts
    }
}

/// Messaging-layer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Socket origin, `ws://`/`wss://` (an `http(s)://` origin is converted).
    pub base_url: String,
    /// Path prefix of the session-scoped socket route.
    pub ws_path: String,
    /// Display name of the session's chat channel.
    pub channel_name: String,
    pub reconnect: ReconnectPolicy,
    /// Body field name on outbound frames.
    pub payload_field: PayloadField,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            ws_path: DEFAULT_WS_PATH.to_owned(),
            channel_name: DEFAULT_CHANNEL_NAME.to_owned(),
            reconnect: ReconnectPolicy::default(),
            payload_field: PayloadField::default(),
        }
    }
}

impl ClientConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `MIX_BASE_URL`: default `ws://localhost:8080`
    /// - `MIX_WS_PATH`: default `/api/v1/ws`
    /// - `MIX_CHANNEL_NAME`: default `General`
    /// - `MIX_RECONNECT_INITIAL_MS`: default 1000
    /// - `MIX_RECONNECT_MAX_MS`: default 10000
    /// - `MIX_RECONNECT_MAX_ATTEMPTS`: default 5
    /// - `MIX_PAYLOAD_FIELD`: `payload` (default) or `data`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        Self {
            base_url: string("MIX_BASE_URL", DEFAULT_BASE_URL),
            ws_path: string("MIX_WS_PATH", DEFAULT_WS_PATH),
            channel_name: string("MIX_CHANNEL_NAME", DEFAULT_CHANNEL_NAME),
            reconnect: ReconnectPolicy {
                initial_delay_ms: parse_or(&lookup, "MIX_RECONNECT_INITIAL_MS", DEFAULT_RECONNECT_INITIAL_MS),
                max_delay_ms: parse_or(&lookup, "MIX_RECONNECT_MAX_MS", DEFAULT_RECONNECT_MAX_MS),
                max_attempts: parse_or(&lookup, "MIX_RECONNECT_MAX_ATTEMPTS", DEFAULT_RECONNECT_MAX_ATTEMPTS),
            },
            payload_field: lookup("MIX_PAYLOAD_FIELD")
                .and_then(|v| PayloadField::from_name(&v))
                .unwrap_or_default(),
        }
    }

    /// Socket URL for `session_id`, e.g. `ws://host/api/v1/ws/<id>`.
    #[must_use]
    pub fn endpoint(&self, session_id: &str) -> String {
        let base = socket_origin(self.base_url.trim_end_matches('/'));
        let path = self.ws_path.trim_matches('/');
        if path.is_empty() {
            format!("{base}/{session_id}")
        } else {
            format!("{base}/{path}/{session_id}")
        }
    }
}

fn socket_origin(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return format!("ws://{rest}");
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return format!("wss://{rest}");
    }
    base_url.to_owned()
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
