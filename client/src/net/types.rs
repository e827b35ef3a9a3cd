//! Wire and domain DTOs for the mix realtime protocol.
//!
//! DESIGN
//! ======
//! Domain payloads use the nested shape the UI consumes (`sender: {id, name}`,
//! `channel: {id, name}`). The backend's flat shapes only appear as the
//! `*Wire` structs and are reshaped in `net::normalize`. Timestamps stay as
//! ISO-8601 strings so values pass through untouched.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use frames::Frame;

/// Connection lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No transport; nothing is being attempted.
    #[default]
    Disconnected,
    /// Opening a transport, or retrying after an unexpected close.
    Connecting,
    /// Transport open; sends are transmitted.
    Connected,
    /// Connecting failed or the retry budget ran out; needs a manual connect.
    Error,
}

impl ConnectionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant: client-generated id plus display name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// A chat channel within a mix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

/// A chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    /// Client-generated correlation id.
    pub id: String,
    pub sender: User,
    pub channel: Channel,
    pub text: String,
    /// ISO-8601 send time, stamped at submission.
    pub sent_at: String,
}

/// Presence change for one participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEventPayload {
    pub user: User,
    pub channel_id: String,
}

/// Server-reported failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A recipe URL submission in domain shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeUrlRequestPayload {
    pub id: String,
    pub sender: User,
    pub channel: Channel,
    pub url: String,
    pub sent_at: String,
}

/// Flattened recipe submission as it travels on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeUrlRequestWire {
    pub sender_id: String,
    pub sender_name: String,
    #[serde(default)]
    pub session_id: String,
    pub url: String,
}

/// Processing phase reported while a recipe URL is parsed.
///
/// The set is open-ended; unknown phases are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecipePhase {
    Fetching,
    Parsing,
    Analyzing,
    Completing,
    Other(String),
}

impl RecipePhase {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Analyzing => "analyzing",
            Self::Completing => "completing",
            Self::Other(raw) => raw,
        }
    }

    /// Human-readable status line; unknown phases degrade to a generic one.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Fetching => "Fetching recipe data...",
            Self::Parsing => "Parsing ingredients and steps...",
            Self::Analyzing => "Analyzing cooking methods...",
            Self::Completing => "Almost ready...",
            Self::Other(_) => "Processing...",
        }
    }
}

impl From<&str> for RecipePhase {
    fn from(raw: &str) -> Self {
        match raw {
            "fetching" => Self::Fetching,
            "parsing" => Self::Parsing,
            "analyzing" => Self::Analyzing,
            "completing" => Self::Completing,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for RecipePhase {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<RecipePhase> for String {
    fn from(phase: RecipePhase) -> Self {
        phase.as_str().to_owned()
    }
}

/// Progress update for an in-flight recipe submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeProgressPayload {
    pub request: RecipeUrlRequestPayload,
    pub phase: RecipePhase,
    pub status: String,
    pub message: String,
}

/// Outcome of a recipe result frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultStatus {
    Success,
    /// Any non-success status, kept verbatim (e.g. `ERROR_SERVICE_UNAVAILABLE`).
    Error(String),
}

impl ResultStatus {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<String> for ResultStatus {
    fn from(raw: String) -> Self {
        if raw == "success" { Self::Success } else { Self::Error(raw) }
    }
}

impl From<ResultStatus> for String {
    fn from(status: ResultStatus) -> Self {
        match status {
            ResultStatus::Success => "success".to_owned(),
            ResultStatus::Error(raw) => raw,
        }
    }
}

/// Recipe results broadcast to the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeResultPayload {
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RecipeUrlRequestPayload>,
    pub list: Vec<Recipe>,
}

/// Normalized grocery item an ingredient links to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grocery_item: Option<GroceryItem>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// A parsed recipe, owned by the session-scoped collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub name: String,
    /// Source URL the recipe was parsed from.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    /// Participant who shared the URL, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharer: Option<User>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Identification handshake payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyPayload {
    pub user_id: String,
    pub user_name: String,
}

impl From<&User> for IdentifyPayload {
    fn from(user: &User) -> Self {
        Self { user_id: user.id.clone(), user_name: user.name.clone() }
    }
}

/// A normalized inbound event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DomainEvent {
    #[serde(flatten)]
    pub event: Event,
    /// ISO-8601 time the sender stamped, or the local receive time.
    pub timestamp: String,
}

/// The known inbound event kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    #[serde(rename = "CHAT_MESSAGE")]
    ChatMessage(ChatMessagePayload),
    #[serde(rename = "USER_JOINED")]
    UserJoined(UserEventPayload),
    #[serde(rename = "USER_LEFT")]
    UserLeft(UserEventPayload),
    #[serde(rename = "ERROR")]
    Error(ErrorPayload),
    #[serde(rename = "RECIPE_URL_REQUEST")]
    RecipeSubmission(RecipeUrlRequestPayload),
    #[serde(rename = "RECIPE_PROGRESS")]
    RecipeProgress(RecipeProgressPayload),
    #[serde(rename = "RECIPE_ADDITIONS")]
    RecipeResult(RecipeResultPayload),
}

impl Event {
    /// Canonical wire type for this event kind.
    #[must_use]
    pub fn wire_type(&self) -> &'static str {
        use frames::kind;
        match self {
            Self::ChatMessage(_) => kind::CHAT_MESSAGE,
            Self::UserJoined(_) => kind::USER_JOINED,
            Self::UserLeft(_) => kind::USER_LEFT,
            Self::Error(_) => kind::ERROR,
            Self::RecipeSubmission(_) => kind::RECIPE_URL_REQUEST,
            Self::RecipeProgress(_) => kind::RECIPE_PROGRESS,
            Self::RecipeResult(_) => kind::RECIPE_ADDITIONS,
        }
    }
}
