//! Realtime messaging layer.
//!
//! SYSTEM CONTEXT
//! ==============
//! `connection` owns the socket lifecycle, `dispatcher` and `normalize` turn
//! inbound frames into typed events, `identity` performs the handshake,
//! `commands` builds outbound messages, and `service` wires them together.
//! `transport` is the seam to the host's socket and timer implementations.

pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod registry;
pub mod service;
pub mod transport;
#[cfg(feature = "hydrate")]
pub mod transport_browser;
#[cfg(feature = "native")]
pub mod transport_native;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
