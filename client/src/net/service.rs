//! `MessagingService`: the explicitly owned entry point UI code talks to.
//!
//! SYSTEM CONTEXT
//! ==============
//! One service per page (or per session, for hosts that want several)
//! wires a connection manager, its dispatcher, the identity binding and the
//! command builders together. UI collaborators receive it by reference or
//! clone the inner handles they need; nothing here is global.

#[cfg(test)]
#[path = "service_test.rs"]
mod service_test;

use std::rc::Rc;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::net::commands::{
    ChatDraft, OutboundCommand, RecipeSubmission, Stamp, build_chat_message, build_recipe_submission,
};
use crate::net::connection::ConnectionManager;
use crate::net::dispatcher::EventDispatcher;
use crate::net::error::{CommandError, ConnectionError, HandlerResult, IdentityError};
use crate::net::identity::IdentityBinding;
use crate::net::registry::Subscription;
use crate::net::transport::{Runtime, Transport};
use crate::net::types::{Channel, ChatMessagePayload, ConnectionState, DomainEvent, Frame, User};
use crate::util::route::session_id_from_path;

const CHAT_ID_PREFIX: &str = "msg";
const RECIPE_ID_PREFIX: &str = "recipe";

pub struct MessagingService {
    connection: ConnectionManager,
    dispatcher: EventDispatcher,
    binding: IdentityBinding,
}

impl MessagingService {
    #[must_use]
    pub fn new(config: ClientConfig, transport: Rc<dyn Transport>, runtime: Rc<dyn Runtime>) -> Self {
        let dispatcher = EventDispatcher::new(config.channel_name.clone());
        let connection = ConnectionManager::new(config, transport, runtime, dispatcher.clone());
        let binding = IdentityBinding::new(connection.clone());
        Self { connection, dispatcher, binding }
    }

    /// Service backed by tokio-tungstenite; must run inside a tokio `LocalSet`.
    #[cfg(feature = "native")]
    #[must_use]
    pub fn native(config: ClientConfig) -> Self {
        use crate::net::transport_native::{TokioRuntime, TungsteniteTransport};
        Self::new(config, Rc::new(TungsteniteTransport), Rc::new(TokioRuntime))
    }

    /// Service backed by the browser socket, pointed at the page's origin.
    #[cfg(feature = "hydrate")]
    #[must_use]
    pub fn browser() -> Self {
        use crate::net::transport_browser::{BrowserRuntime, GlooTransport, browser_config};
        Self::new(browser_config(), Rc::new(GlooTransport), Rc::new(BrowserRuntime))
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn connect(&self, session_id: &str) {
        self.connection.connect(session_id);
    }

    /// Connect to the session named by a `/mixes/:id` page path.
    ///
    /// Returns `false` when the path is not a mix route.
    pub fn connect_path(&self, path: &str) -> bool {
        match session_id_from_path(path) {
            Some(session_id) => {
                self.connection.connect(session_id);
                true
            }
            None => {
                log::debug!("no session in path {path}");
                false
            }
        }
    }

    pub fn reconnect(&self) {
        self.connection.reconnect();
    }

    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<ConnectionError> {
        self.connection.last_error()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.connection.session_id()
    }

    /// The session's chat channel, once a session is bound.
    #[must_use]
    pub fn session_channel(&self) -> Option<Channel> {
        self.session_id().map(|id| Channel { id, name: self.connection.config().channel_name.clone() })
    }

    pub fn on_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ConnectionState) -> HandlerResult + 'static,
    {
        self.connection.on_state_change(listener)
    }

    pub fn on<F>(&self, wire_type: &str, handler: F) -> Subscription
    where
        F: Fn(&Frame) -> HandlerResult + 'static,
    {
        self.dispatcher.on(wire_type, handler)
    }

    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DomainEvent) -> HandlerResult + 'static,
    {
        self.dispatcher.on_message(handler)
    }

    /// Bind the local identity; the handshake follows once connected.
    ///
    /// # Errors
    ///
    /// See [`IdentityBinding::set_identity`].
    pub fn set_identity(&self, user: User) -> Result<(), IdentityError> {
        self.binding.set_identity(user)
    }

    #[must_use]
    pub fn identity(&self) -> Option<User> {
        self.binding.identity()
    }

    /// Raw send. Returns `false` when nothing was written.
    pub fn send(&self, kind: &str, payload: Value) -> bool {
        self.connection.send(kind, payload)
    }

    /// Stamp and send a chat message.
    ///
    /// On success the returned payload is what went on the wire; insert it
    /// optimistically and let the server echo confirm it by id.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotConnected`], [`CommandError::NotIdentified`] or
    /// [`CommandError::EmptyMessage`]; nothing is sent in those cases.
    pub fn send_chat_message(&self, draft: ChatDraft) -> Result<ChatMessagePayload, CommandError> {
        let sender = self.sender()?;
        let message = build_chat_message(draft, &sender, Stamp::now(CHAT_ID_PREFIX))?;
        self.transmit(&OutboundCommand::ChatMessage(message.clone()))?;
        Ok(message)
    }

    /// Send `text` to the session channel.
    ///
    /// # Errors
    ///
    /// As [`MessagingService::send_chat_message`], plus
    /// [`CommandError::NoSession`] when no session is bound.
    pub fn send_chat_text(&self, text: &str) -> Result<ChatMessagePayload, CommandError> {
        let channel = self.session_channel().ok_or(CommandError::NoSession)?;
        self.send_chat_message(ChatDraft { channel, text: text.to_owned() })
    }

    /// Stamp and send a recipe URL for parsing.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotConnected`], [`CommandError::NotIdentified`],
    /// [`CommandError::NoSession`] or [`CommandError::EmptyUrl`].
    pub fn submit_recipe_url(&self, url: &str) -> Result<RecipeSubmission, CommandError> {
        let sender = self.sender()?;
        let session_id = self.session_id().ok_or(CommandError::NoSession)?;
        let submission = build_recipe_submission(
            url,
            &sender,
            &session_id,
            &self.connection.config().channel_name,
            Stamp::now(RECIPE_ID_PREFIX),
        )?;
        self.transmit(&OutboundCommand::RecipeUrlRequest(submission.wire.clone()))?;
        Ok(submission)
    }

    fn sender(&self) -> Result<User, CommandError> {
        let state = self.connection.state();
        if state != ConnectionState::Connected {
            log::warn!("command rejected: connection is {state}");
            return Err(CommandError::NotConnected { state });
        }
        self.binding.identity().ok_or(CommandError::NotIdentified)
    }

    fn transmit(&self, command: &OutboundCommand) -> Result<(), CommandError> {
        let payload = command.payload()?;
        if self.connection.send(command.wire_type(), payload) {
            Ok(())
        } else {
            Err(CommandError::NotConnected { state: self.connection.state() })
        }
    }
}
