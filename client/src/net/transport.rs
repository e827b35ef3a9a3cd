//! Seams between the connection manager and its host environment.
//!
//! The manager never touches a socket or a timer directly. A [`Transport`]
//! opens a [`Link`] to a URL and a [`Runtime`] spawns the connection task
//! and provides backoff sleeps. The browser build plugs in gloo-net and
//! `wasm-bindgen-futures`; native hosts plug in tokio-tungstenite and tokio.

use std::pin::Pin;
use std::time::Duration;

use futures::Sink;
use futures::future::LocalBoxFuture;
use futures::stream::LocalBoxStream;

use crate::net::error::TransportError;

/// Outbound half of an open link. Items are encoded JSON text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError>>>;

/// Inbound half of an open link. Ends when the peer closes the socket.
pub type FrameStream = LocalBoxStream<'static, Result<String, TransportError>>;

/// An established, full-duplex text link.
pub struct Link {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Link {
    #[must_use]
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens links to session endpoints.
pub trait Transport {
    /// Resolve once the link is open, or with the reason it could not be.
    fn open(&self, url: &str) -> LocalBoxFuture<'static, Result<Link, TransportError>>;
}

/// Single-threaded task host.
pub trait Runtime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}
