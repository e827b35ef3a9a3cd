//! Browser transport over gloo-net, scheduled with `wasm-bindgen-futures`.

use std::time::Duration;

use futures::future::{self, LocalBoxFuture};
use futures::{FutureExt, SinkExt, StreamExt};
use gloo_net::websocket::Message;
use gloo_net::websocket::futures::WebSocket;

use crate::config::ClientConfig;
use crate::net::error::TransportError;
use crate::net::transport::{Link, Runtime, Transport};

#[derive(Debug, Default, Clone, Copy)]
pub struct GlooTransport;

impl Transport for GlooTransport {
    fn open(&self, url: &str) -> LocalBoxFuture<'static, Result<Link, TransportError>> {
        let opened = WebSocket::open(url).map_err(|e| TransportError::Open(e.to_string()));
        async move {
            let (write, read) = opened?.split();

            let sink = write
                .with(|text: String| future::ready(Ok::<_, gloo_net::websocket::WebSocketError>(Message::Text(text))))
                .sink_map_err(|e| TransportError::Send(e.to_string()));

            let stream = read.filter_map(|message| {
                future::ready(match message {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(Message::Bytes(bytes)) => String::from_utf8(bytes).ok().map(Ok),
                    Err(e) => Some(Err(TransportError::Receive(e.to_string()))),
                })
            });

            Ok(Link::new(Box::pin(sink), stream.boxed_local()))
        }
        .boxed_local()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserRuntime;

impl Runtime for BrowserRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        gloo_timers::future::sleep(duration).boxed_local()
    }
}

/// Default config with the socket origin taken from `window.location`.
#[must_use]
pub fn browser_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    let location = web_sys::window().map(|w| w.location());
    let host = location.as_ref().and_then(|l| l.host().ok());
    let protocol = location.as_ref().and_then(|l| l.protocol().ok()).unwrap_or_default();
    if let Some(host) = host.filter(|h| !h.is_empty()) {
        let scheme = if protocol.starts_with("https") { "wss" } else { "ws" };
        config.base_url = format!("{scheme}://{host}");
    }
    config
}

/// Current page path, e.g. `/mixes/<id>`.
#[must_use]
pub fn current_path() -> Option<String> {
    web_sys::window().and_then(|w| w.location().pathname().ok())
}
