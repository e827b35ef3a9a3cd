//! Error taxonomy for the messaging layer.
//!
//! Nothing here is ever raised past a listener boundary: transport errors
//! become connection-state transitions, command errors are returned to the
//! caller that issued the command, and handler errors are logged.

use crate::net::types::ConnectionState;

/// Failure reported by a [`Transport`](crate::net::transport::Transport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The socket could not be opened or the handshake was rejected.
    #[error("failed to open socket: {0}")]
    Open(String),
    /// Writing a frame failed.
    #[error("failed to send frame: {0}")]
    Send(String),
    /// Reading from the socket failed.
    #[error("socket receive failed: {0}")]
    Receive(String),
}

/// Error carried by the `error` connection state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Automatic reconnection gave up; a manual `connect`/`reconnect` is required.
    #[error("gave up reconnecting after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        last: Option<TransportError>,
    },
}

/// Rejection of an outbound command before anything reached the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("connection is {state}, not connected")]
    NotConnected { state: ConnectionState },
    #[error("no identity has been set for this session")]
    NotIdentified,
    #[error("no session is bound to the connection")]
    NoSession,
    #[error("message text is empty")]
    EmptyMessage,
    #[error("recipe url is empty")]
    EmptyUrl,
    #[error("failed to encode {kind} payload: {reason}")]
    Encode { kind: &'static str, reason: String },
}

/// Rejection of an identity change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Identities are immutable once bound to a session.
    #[error("identity already set to {current}")]
    AlreadySet { current: String },
    #[error("display name is blank")]
    BlankName,
}

/// An inbound frame that cannot become a domain event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("unrecognized wire type {0}")]
    Unrecognized(String),
    #[error("malformed {kind} payload: {reason}")]
    Malformed { kind: String, reason: String },
}

/// Error a listener may return; logged and isolated by the caller.
pub type HandlerError = Box<dyn std::error::Error>;

/// Return type of every registered listener.
pub type HandlerResult = Result<(), HandlerError>;
