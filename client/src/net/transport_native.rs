//! Native transport over tokio-tungstenite, driven by a tokio `LocalSet`.

use std::time::Duration;

use futures::future::{self, LocalBoxFuture};
use futures::{FutureExt, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::net::error::TransportError;
use crate::net::transport::{Link, Runtime, Transport};

/// Opens `ws://`/`wss://` links with `tokio_tungstenite::connect_async`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteTransport;

impl Transport for TungsteniteTransport {
    fn open(&self, url: &str) -> LocalBoxFuture<'static, Result<Link, TransportError>> {
        let url = url.to_owned();
        async move {
            let (socket, _response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::Open(e.to_string()))?;
            let (write, read) = socket.split();

            let sink = write
                .with(|text: String| future::ready(Ok::<_, tokio_tungstenite::tungstenite::Error>(Message::text(text))))
                .sink_map_err(|e| TransportError::Send(e.to_string()));

            let stream = read.filter_map(|message| {
                future::ready(match message {
                    Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Binary(bytes)) => String::from_utf8(bytes.to_vec()).ok().map(Ok),
                    Ok(_) => None,
                    Err(e) => Some(Err(TransportError::Receive(e.to_string()))),
                })
            });

            Ok(Link::new(Box::pin(sink), stream.boxed_local()))
        }
        .boxed_local()
    }
}

/// Spawns onto the current tokio `LocalSet`.
///
/// `spawn` panics outside a `LocalSet`, as `tokio::task::spawn_local` does.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRuntime;

impl Runtime for TokioRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        drop(tokio::task::spawn_local(task));
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed_local()
    }
}
