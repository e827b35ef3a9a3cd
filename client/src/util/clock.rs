//! Wall-clock and identifier helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Outbound commands and locally-synthesized events need ISO-8601 timestamps
//! and unique ids. Keeping both here lets every caller stamp consistently
//! on native and wasm targets alike.

#[cfg(test)]
#[path = "clock_test.rs"]
mod clock_test;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const EPOCH_ISO: &str = "1970-01-01T00:00:00Z";

/// Current UTC time as an RFC 3339 / ISO-8601 string.
#[must_use]
pub fn now_iso() -> String {
    format_iso(OffsetDateTime::now_utc())
}

/// Format `at` as an RFC 3339 string, falling back to the Unix epoch.
#[must_use]
pub fn format_iso(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| EPOCH_ISO.to_owned())
}

/// Generate a prefixed random id, e.g. `msg-6f1c...`.
#[must_use]
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// Derive a stable prefixed id from arbitrary bytes.
///
/// The same `seed` always yields the same id.
#[must_use]
pub fn derived_id(prefix: &str, seed: &[u8]) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, seed))
}
