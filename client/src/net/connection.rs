//! Connection manager: one logical socket per session.
//!
//! DESIGN
//! ======
//! The manager owns the lifecycle of a single socket bound to a session id
//! and exposes its state machine:
//!
//! ```text
//! disconnected --connect()--> connecting --(link open)--> connected
//! connecting --(failure)--> error
//! connected --(unexpected close)--> connecting --(budget spent)--> error
//! any --disconnect()--> disconnected
//! ```
//!
//! Each `connect` spawns one connection task tagged with a generation
//! number. `disconnect` and session switches bump the generation and drop
//! the outbound sender, which ends the old task's pump; a stale task never
//! touches state again.
//!
//! Outbound frames are fire-only-when-connected. Nothing is queued across
//! reconnects.

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::net::commands::OutboundCommand;
use crate::net::dispatcher::EventDispatcher;
use crate::net::error::{ConnectionError, HandlerResult, TransportError};
use crate::net::registry::{Registry, Subscription, invoke_isolated};
use crate::net::transport::{Link, Runtime, Transport};
use crate::net::types::{ConnectionState, Frame};

/// Listener for connection state transitions.
pub type StateListener = dyn Fn(ConnectionState) -> HandlerResult;

#[derive(Default)]
struct Inner {
    state: ConnectionState,
    session_id: Option<String>,
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    last_error: Option<ConnectionError>,
    epoch: u64,
    /// Transitions waiting for delivery, oldest first.
    queued: VecDeque<ConnectionState>,
    delivering: bool,
}

struct Shared {
    config: ClientConfig,
    transport: Rc<dyn Transport>,
    runtime: Rc<dyn Runtime>,
    dispatcher: EventDispatcher,
    inner: RefCell<Inner>,
    listeners: Rc<Registry<(), StateListener>>,
}

/// How a pumped link ended.
enum LinkEnd {
    /// The manager dropped the outbound sender.
    Requested,
    /// The peer closed the socket or an I/O error occurred.
    Dropped(Option<TransportError>),
}

/// Cloneable handle to one connection.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Rc<Shared>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(
        config: ClientConfig,
        transport: Rc<dyn Transport>,
        runtime: Rc<dyn Runtime>,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                config,
                transport,
                runtime,
                dispatcher,
                inner: RefCell::new(Inner::default()),
                listeners: Rc::new(Registry::default()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.borrow().state
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Session the manager is (or was last) bound to.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.shared.inner.borrow().session_id.clone()
    }

    /// Error carried by the `error` state, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<ConnectionError> {
        self.shared.inner.borrow().last_error.clone()
    }

    /// Number of transitions into `connected` so far.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.shared.inner.borrow().epoch
    }

    /// Connect to `session_id`.
    ///
    /// No-op when already connected or connecting to the same session.
    /// A different session tears the current link down first. Failures
    /// surface as a transition to `error`.
    pub fn connect(&self, session_id: &str) {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            log::warn!("connect ignored: empty session id");
            return;
        }

        let already_active = {
            let inner = self.shared.inner.borrow();
            inner.session_id.as_deref() == Some(session_id)
                && matches!(inner.state, ConnectionState::Connected | ConnectionState::Connecting)
        };
        if already_active {
            log::debug!("connect no-op: session {session_id} already {}", self.state());
            return;
        }

        self.start(session_id.to_owned());
    }

    /// Re-establish the link to the last session, resetting the retry budget.
    pub fn reconnect(&self) {
        let Some(session_id) = self.session_id() else {
            log::warn!("reconnect ignored: no session has been connected");
            return;
        };
        self.start(session_id);
    }

    /// Close the link and settle in `disconnected`. Idempotent.
    pub fn disconnect(&self) {
        let was_idle = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.generation += 1;
            inner.outbound = None;
            inner.state == ConnectionState::Disconnected
        };
        if !was_idle {
            log::info!("disconnecting");
            self.transition(ConnectionState::Disconnected);
        }
    }

    /// Encode and write one frame. Returns `false` when nothing was written.
    pub fn send(&self, kind: &str, payload: Value) -> bool {
        let frame = Frame::new(kind, payload).stamped(crate::util::clock::now_iso());
        self.send_frame(&frame)
    }

    /// Send a built command. Returns `false` when nothing was written.
    pub fn send_command(&self, command: &OutboundCommand) -> bool {
        match command.payload() {
            Ok(payload) => self.send(command.wire_type(), payload),
            Err(e) => {
                log::warn!("dropping command: {e}");
                false
            }
        }
    }

    /// Write a prepared frame. Returns `false` when nothing was written.
    pub fn send_frame(&self, frame: &Frame) -> bool {
        let inner = self.shared.inner.borrow();
        let Some(outbound) = inner.outbound.as_ref().filter(|_| inner.state == ConnectionState::Connected) else {
            log::warn!("dropping {} frame: connection is {}", frame.kind, inner.state);
            return false;
        };
        match frames::encode_frame_with(frame, self.shared.config.payload_field) {
            Ok(text) => outbound.unbounded_send(text).is_ok(),
            Err(e) => {
                log::warn!("dropping {} frame: {e}", frame.kind);
                false
            }
        }
    }

    /// Register a state listener. It sees transitions only; read
    /// [`ConnectionManager::state`] for the current value.
    pub fn on_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ConnectionState) -> HandlerResult + 'static,
    {
        let id = self.shared.listeners.insert((), Rc::new(listener));
        Subscription::for_handle(&self.shared.listeners, (), id)
    }

    fn start(&self, session_id: String) {
        let (generation, was_active) = {
            let mut inner = self.shared.inner.borrow_mut();
            inner.generation += 1;
            inner.outbound = None;
            inner.last_error = None;
            inner.session_id = Some(session_id.clone());
            let was_active = matches!(inner.state, ConnectionState::Connected | ConnectionState::Connecting);
            (inner.generation, was_active)
        };
        if was_active {
            self.transition(ConnectionState::Disconnected);
        }
        self.transition(ConnectionState::Connecting);

        let url = self.shared.config.endpoint(&session_id);
        log::info!("connecting to session {session_id} at {url}");
        let task = self.clone().run(generation, url);
        self.shared.runtime.spawn(Box::pin(task));
    }

    fn is_current(&self, generation: u64) -> bool {
        self.shared.inner.borrow().generation == generation
    }

    async fn run(self, generation: u64, url: String) {
        let policy = self.shared.config.reconnect;
        let mut attempt: u32 = 0;
        let mut recovering = false;
        let mut last_failure: Option<TransportError> = None;

        loop {
            let opened = self.shared.transport.open(&url).await;
            if !self.is_current(generation) {
                return;
            }

            match opened {
                Ok(link) => {
                    attempt = 0;
                    last_failure = None;
                    let (tx, rx) = mpsc::unbounded();
                    self.shared.inner.borrow_mut().outbound = Some(tx);
                    self.transition(ConnectionState::Connected);

                    match self.pump(link, rx).await {
                        LinkEnd::Requested => return,
                        LinkEnd::Dropped(err) => {
                            if !self.is_current(generation) {
                                return;
                            }
                            match &err {
                                Some(e) => log::warn!("connection lost: {e}"),
                                None => log::warn!("connection closed by server"),
                            }
                            self.shared.inner.borrow_mut().outbound = None;
                            last_failure = err;
                            recovering = true;
                            self.transition(ConnectionState::Connecting);
                        }
                    }
                }
                Err(err) if !recovering => {
                    log::warn!("connect failed: {err}");
                    self.fail(ConnectionError::Transport(err));
                    return;
                }
                Err(err) => {
                    log::warn!("reconnect attempt {attempt} failed: {err}");
                    last_failure = Some(err);
                }
            }

            if !self.is_current(generation) {
                return;
            }
            attempt += 1;
            if !policy.allows(attempt) {
                let attempts = attempt - 1;
                log::error!("giving up after {attempts} reconnect attempts");
                self.fail(ConnectionError::RetriesExhausted { attempts, last: last_failure });
                return;
            }
            let delay = policy.delay_for(attempt);
            log::info!("reconnect attempt {attempt} in {}ms", delay.as_millis());
            self.shared.runtime.sleep(delay).await;
            if !self.is_current(generation) {
                return;
            }
        }
    }

    async fn pump(&self, link: Link, mut outbound: mpsc::UnboundedReceiver<String>) -> LinkEnd {
        let Link { mut sink, stream } = link;
        let mut inbound = stream.fuse();

        loop {
            futures::select! {
                next = outbound.next() => match next {
                    Some(text) => {
                        if let Err(e) = sink.send(text).await {
                            return LinkEnd::Dropped(Some(e));
                        }
                    }
                    None => {
                        if let Err(e) = sink.close().await {
                            log::debug!("close failed: {e}");
                        }
                        return LinkEnd::Requested;
                    }
                },
                next = inbound.next() => match next {
                    Some(Ok(text)) => self.shared.dispatcher.dispatch_text(&text),
                    Some(Err(e)) => return LinkEnd::Dropped(Some(e)),
                    None => return LinkEnd::Dropped(None),
                },
            }
        }
    }

    fn fail(&self, err: ConnectionError) {
        {
            let mut inner = self.shared.inner.borrow_mut();
            inner.outbound = None;
            inner.last_error = Some(err);
        }
        self.transition(ConnectionState::Error);
    }

    /// Apply `next` and notify listeners.
    ///
    /// A listener may trigger another transition. That one is queued and
    /// delivered after every listener has seen the current one, so all
    /// listeners observe the same ordered sequence.
    fn transition(&self, next: ConnectionState) {
        {
            let mut inner = self.shared.inner.borrow_mut();
            if inner.state == next {
                return;
            }
            inner.state = next;
            if next == ConnectionState::Connected {
                inner.epoch += 1;
            }
            inner.queued.push_back(next);
            if inner.delivering {
                return;
            }
            inner.delivering = true;
        }

        loop {
            let queued = self.shared.inner.borrow_mut().queued.pop_front();
            let Some(state) = queued else {
                break;
            };
            log::debug!("connection state -> {state}");
            for listener in self.shared.listeners.snapshot(&()) {
                invoke_isolated("connection state", || listener(state));
            }
        }
        self.shared.inner.borrow_mut().delivering = false;
    }
}
