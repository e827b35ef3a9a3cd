//! Event dispatcher: raw frames in, typed listeners out.
//!
//! DESIGN
//! ======
//! Listeners subscribe either to one raw wire type (`on`) or to every
//! domain-event type at once (`on_message`). Delivery follows frame arrival
//! order and runs each listener in isolation: a failing or panicking
//! listener is logged and its siblings still run.

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod dispatcher_test;

use std::rc::Rc;

use frames::kind;

use crate::net::error::HandlerResult;
use crate::net::normalize::normalize;
use crate::net::registry::{Registry, Subscription, invoke_isolated};
use crate::net::types::{DomainEvent, Frame};
use crate::util::clock::now_iso;

/// Listener for one raw wire type.
pub type FrameHandler = dyn Fn(&Frame) -> HandlerResult;

/// Listener for normalized domain events.
pub type EventHandler = dyn Fn(&DomainEvent) -> HandlerResult;

struct Inner {
    channel_name: String,
    handlers: Rc<Registry<String, FrameHandler>>,
}

/// Cloneable handle; clones share one listener registry.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Rc<Inner>,
}

impl EventDispatcher {
    /// `channel_name` labels the session channel in reshaped payloads.
    #[must_use]
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(Inner {
                channel_name: channel_name.into(),
                handlers: Rc::new(Registry::default()),
            }),
        }
    }

    /// Subscribe to raw frames of `wire_type`.
    pub fn on<F>(&self, wire_type: &str, handler: F) -> Subscription
    where
        F: Fn(&Frame) -> HandlerResult + 'static,
    {
        let key = wire_type.to_owned();
        let id = self.inner.handlers.insert(key.clone(), Rc::new(handler));
        Subscription::for_handle(&self.inner.handlers, key, id)
    }

    /// Subscribe to every domain-event type with one handler.
    ///
    /// Frames that fail normalization are logged and skipped. The returned
    /// subscription removes every underlying registration at once.
    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DomainEvent) -> HandlerResult + 'static,
    {
        let handler: Rc<EventHandler> = Rc::new(handler);
        let parts: Vec<Subscription> = kind::INBOUND
            .iter()
            .map(|wire_type| {
                let handler = Rc::clone(&handler);
                let channel_name = self.inner.channel_name.clone();
                self.on(wire_type, move |frame| match normalize(frame, &channel_name) {
                    Ok(event) => handler(&event),
                    Err(e) => {
                        log::warn!("dropping inbound frame: {e}");
                        Ok(())
                    }
                })
            })
            .collect();
        Subscription::combine(parts)
    }

    /// Number of raw listeners registered for `wire_type`.
    #[must_use]
    pub fn listener_count(&self, wire_type: &str) -> usize {
        self.inner.handlers.count(&wire_type.to_owned())
    }

    /// Decode one text frame and deliver it.
    ///
    /// Undecodable text is logged and dropped. Control frames are consumed
    /// here. A frame without a timestamp is stamped with the receive time.
    pub fn dispatch_text(&self, text: &str) {
        let mut frame = match frames::decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("dropping inbound frame: {e}");
                return;
            }
        };
        if kind::is_control(&frame.kind) {
            log::debug!("control frame {}", frame.kind);
            return;
        }
        if !kind::is_inbound(&frame.kind) {
            log::debug!("ignoring unknown frame type {}", frame.kind);
            return;
        }
        if frame.timestamp.is_none() {
            frame.timestamp = Some(now_iso());
        }
        self.dispatch(&frame);
    }

    /// Deliver `frame` to a snapshot of its listeners, in subscription order.
    pub fn dispatch(&self, frame: &Frame) {
        let listeners = self.inner.handlers.snapshot(&frame.kind);
        if listeners.is_empty() {
            log::debug!("no listeners for {}", frame.kind);
            return;
        }
        for listener in listeners {
            invoke_isolated(&frame.kind, || listener(frame));
        }
    }
}
