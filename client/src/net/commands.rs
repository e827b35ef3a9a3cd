//! Outbound command builders.
//!
//! Builders are pure: they take the caller's partial payload, the current
//! identity and a [`Stamp`], and return the complete command. Sending and
//! any optimistic state change are the caller's job.

#[cfg(test)]
#[path = "commands_test.rs"]
mod commands_test;

use serde_json::Value;

use frames::kind;

use crate::net::error::CommandError;
use crate::net::types::{
    Channel, ChatMessagePayload, IdentifyPayload, RecipeUrlRequestPayload, RecipeUrlRequestWire, User,
};
use crate::util::clock::{new_id, now_iso};

/// Client-generated correlation id and send time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stamp {
    pub id: String,
    pub sent_at: String,
}

impl Stamp {
    /// Fresh random id with `prefix` and the current time.
    #[must_use]
    pub fn now(prefix: &str) -> Self {
        Self { id: new_id(prefix), sent_at: now_iso() }
    }
}

/// What the UI supplies for a chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatDraft {
    pub channel: Channel,
    pub text: String,
}

/// A recipe submission in both shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipeSubmission {
    /// Nested form the UI tracks locally.
    pub request: RecipeUrlRequestPayload,
    /// Flattened form sent on the wire.
    pub wire: RecipeUrlRequestWire,
}

/// A complete outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundCommand {
    ChatMessage(ChatMessagePayload),
    RecipeUrlRequest(RecipeUrlRequestWire),
    UserIdentify(IdentifyPayload),
}

impl OutboundCommand {
    #[must_use]
    pub fn wire_type(&self) -> &'static str {
        match self {
            Self::ChatMessage(_) => kind::CHAT_MESSAGE,
            Self::RecipeUrlRequest(_) => kind::RECIPE_URL_REQUEST,
            Self::UserIdentify(_) => kind::USER_IDENTIFY,
        }
    }

    /// Wire payload as JSON.
    ///
    /// # Errors
    ///
    /// [`CommandError::Encode`] if serialization fails.
    pub fn payload(&self) -> Result<Value, CommandError> {
        let encoded = match self {
            Self::ChatMessage(payload) => serde_json::to_value(payload),
            Self::RecipeUrlRequest(payload) => serde_json::to_value(payload),
            Self::UserIdentify(payload) => serde_json::to_value(payload),
        };
        encoded.map_err(|e| CommandError::Encode { kind: self.wire_type(), reason: e.to_string() })
    }
}

/// Complete a chat draft. The text is kept verbatim.
///
/// # Errors
///
/// [`CommandError::EmptyMessage`] when the text is blank.
pub fn build_chat_message(draft: ChatDraft, sender: &User, stamp: Stamp) -> Result<ChatMessagePayload, CommandError> {
    if draft.text.trim().is_empty() {
        return Err(CommandError::EmptyMessage);
    }
    Ok(ChatMessagePayload {
        id: stamp.id,
        sender: sender.clone(),
        channel: draft.channel,
        text: draft.text,
        sent_at: stamp.sent_at,
    })
}

/// Complete a recipe URL submission for `session_id`.
///
/// # Errors
///
/// [`CommandError::EmptyUrl`] for a blank URL and
/// [`CommandError::NoSession`] for a blank session id.
pub fn build_recipe_submission(
    url: &str,
    sender: &User,
    session_id: &str,
    channel_name: &str,
    stamp: Stamp,
) -> Result<RecipeSubmission, CommandError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CommandError::EmptyUrl);
    }
    if session_id.is_empty() {
        return Err(CommandError::NoSession);
    }

    let wire = RecipeUrlRequestWire {
        sender_id: sender.id.clone(),
        sender_name: sender.name.clone(),
        session_id: session_id.to_owned(),
        url: url.to_owned(),
    };
    let request = RecipeUrlRequestPayload {
        id: stamp.id,
        sender: sender.clone(),
        channel: Channel { id: session_id.to_owned(), name: channel_name.to_owned() },
        url: url.to_owned(),
        sent_at: stamp.sent_at,
    };
    Ok(RecipeSubmission { request, wire })
}
