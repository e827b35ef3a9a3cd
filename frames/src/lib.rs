//! Shared frame envelope and JSON codec for the mix realtime socket.
//!
//! Every message on the wire is a JSON text frame shaped as
//! `{type, payload, timestamp?}`. Payloads stay flexible
//! (`serde_json::Value`) so the client can normalize backend shapes on its
//! own terms; this crate only owns the envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recognized wire message types.
pub mod kind {
    /// Chat message, both directions.
    pub const CHAT_MESSAGE: &str = "CHAT_MESSAGE";
    /// A participant identified on the session.
    pub const USER_JOINED: &str = "USER_JOINED";
    /// A participant disconnected from the session.
    pub const USER_LEFT: &str = "USER_LEFT";
    /// Server-side failure report.
    pub const ERROR: &str = "ERROR";
    /// Recipe URL submission (outbound) and its echo (inbound).
    pub const RECIPE_URL_REQUEST: &str = "RECIPE_URL_REQUEST";
    /// Parsing progress for a submitted recipe URL.
    pub const RECIPE_PROGRESS: &str = "RECIPE_PROGRESS";
    /// Legacy single-recipe result.
    pub const RECIPE_URL_RESPONSE: &str = "RECIPE_URL_RESPONSE";
    /// Recipe result batch.
    pub const RECIPE_ADDITIONS: &str = "RECIPE_ADDITIONS";
    /// Identification handshake sent once per established connection.
    pub const USER_IDENTIFY: &str = "USER_IDENTIFY";
    /// Server acknowledgement of a new socket; control only.
    pub const CONNECTION_ACK: &str = "CONNECTION_ACK";
    /// Keepalive; control only.
    pub const PING: &str = "PING";

    /// Inbound types that map onto domain events.
    pub const INBOUND: [&str; 8] = [
        CHAT_MESSAGE,
        USER_JOINED,
        USER_LEFT,
        ERROR,
        RECIPE_URL_REQUEST,
        RECIPE_PROGRESS,
        RECIPE_URL_RESPONSE,
        RECIPE_ADDITIONS,
    ];

    /// Inbound types the client consumes itself and never forwards.
    pub const CONTROL: [&str; 2] = [CONNECTION_ACK, PING];

    /// Whether `wire_type` is a domain-event type.
    #[must_use]
    pub fn is_inbound(wire_type: &str) -> bool {
        INBOUND.contains(&wire_type)
    }

    /// Whether `wire_type` is a control frame.
    #[must_use]
    pub fn is_control(wire_type: &str) -> bool {
        CONTROL.contains(&wire_type)
    }
}

/// Error returned by [`encode_frame`] and [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not valid JSON or does not match the envelope shape.
    #[error("failed to decode frame: {0}")]
    Json(#[from] serde_json::Error),
    /// The envelope carried an empty `type`.
    #[error("frame has an empty type")]
    EmptyType,
}

/// Name of the body field written by [`encode_frame_with`].
///
/// Decoding accepts either name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadField {
    /// `{type, payload, timestamp?}`.
    #[default]
    Payload,
    /// `{type, data, timestamp?}`, the only body name the backend reads.
    Data,
}

impl PayloadField {
    /// Parse `"payload"` or `"data"`, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "payload" => Some(Self::Payload),
            "data" => Some(Self::Data),
            _ => None,
        }
    }
}

/// A single message on the realtime wire protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Wire message type, e.g. `"CHAT_MESSAGE"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Message body. The backend names this field `data`.
    #[serde(default, alias = "data")]
    pub payload: Value,
    /// ISO-8601 creation time, when the sender stamped one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Frame {
    /// Build an unstamped frame.
    #[must_use]
    pub fn new(kind: &str, payload: Value) -> Self {
        Self { kind: kind.to_owned(), payload, timestamp: None }
    }

    /// Attach an ISO-8601 timestamp.
    #[must_use]
    pub fn stamped(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

#[derive(Serialize)]
struct DataFrame<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<&'a str>,
}

/// Encode a frame into JSON text with a `payload` body field.
///
/// # Errors
///
/// Returns [`CodecError::EmptyType`] when the frame has no type, and
/// [`CodecError::Json`] if the payload cannot be serialized.
pub fn encode_frame(frame: &Frame) -> Result<String, CodecError> {
    encode_frame_with(frame, PayloadField::Payload)
}

/// Encode a frame into JSON text, naming the body field `field`.
///
/// # Errors
///
/// Same as [`encode_frame`].
pub fn encode_frame_with(frame: &Frame, field: PayloadField) -> Result<String, CodecError> {
    if frame.kind.is_empty() {
        return Err(CodecError::EmptyType);
    }
    let text = match field {
        PayloadField::Payload => serde_json::to_string(frame)?,
        PayloadField::Data => serde_json::to_string(&DataFrame {
            kind: &frame.kind,
            data: &frame.payload,
            timestamp: frame.timestamp.as_deref(),
        })?,
    };
    Ok(text)
}

/// Decode JSON text into a frame.
///
/// A `null` timestamp is treated as absent.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed text and
/// [`CodecError::EmptyType`] for an empty `type`.
pub fn decode_frame(text: &str) -> Result<Frame, CodecError> {
    let frame: Frame = serde_json::from_str(text)?;
    if frame.kind.is_empty() {
        return Err(CodecError::EmptyType);
    }
    Ok(frame)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
