//! Backend-to-client payload reshaping.
//!
//! The backend flattens participants into sibling scalars
//! (`senderId`/`senderName`, `userId`/`userName`) and omits client ids on
//! the events it synthesizes. The UI consumes nested `sender`/`channel`
//! objects with stable ids. Everything here is a pure function of the frame:
//! synthetic ids are digests of the frame contents, never random.
//!
//! Nested shapes pass through unchanged, so frames relayed from other
//! clients and frames built by the backend normalize the same way.

#[cfg(test)]
#[path = "normalize_test.rs"]
mod normalize_test;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::net::error::NormalizeError;
use crate::net::types::{
    Channel, ChatMessagePayload, DomainEvent, ErrorPayload, Event, Frame, Recipe, RecipeProgressPayload,
    RecipeResultPayload, RecipeUrlRequestPayload, ResultStatus, User, UserEventPayload,
};
use crate::util::clock::derived_id;
use frames::kind;

/// Envelope type older clients wrapped chat payloads in.
const LEGACY_CHAT_ENVELOPE: &str = "MESSAGE";

/// Reshape one inbound frame into a domain event.
///
/// `channel_name` labels the session's single chat channel when the wire
/// payload only carries a session id.
///
/// # Errors
///
/// [`NormalizeError::Unrecognized`] for types outside [`kind::INBOUND`] and
/// [`NormalizeError::Malformed`] when required fields are missing.
pub fn normalize(frame: &Frame, channel_name: &str) -> Result<DomainEvent, NormalizeError> {
    let timestamp = frame.timestamp.clone().unwrap_or_default();
    let malformed = |reason: String| NormalizeError::Malformed { kind: frame.kind.clone(), reason };

    let event = match frame.kind.as_str() {
        kind::CHAT_MESSAGE => Event::ChatMessage(chat_message(frame, channel_name).map_err(malformed)?),
        kind::USER_JOINED => Event::UserJoined(user_event(&frame.payload).map_err(malformed)?),
        kind::USER_LEFT => Event::UserLeft(user_event(&frame.payload).map_err(malformed)?),
        kind::ERROR => Event::Error(error_payload(&frame.payload).map_err(malformed)?),
        kind::RECIPE_URL_REQUEST => {
            Event::RecipeSubmission(recipe_request(&frame.payload, frame, channel_name).map_err(malformed)?)
        }
        kind::RECIPE_PROGRESS => Event::RecipeProgress(recipe_progress(frame, channel_name).map_err(malformed)?),
        kind::RECIPE_URL_RESPONSE | kind::RECIPE_ADDITIONS => {
            Event::RecipeResult(recipe_result(frame, channel_name).map_err(malformed)?)
        }
        other => return Err(NormalizeError::Unrecognized(other.to_owned())),
    };

    Ok(DomainEvent { event, timestamp })
}

fn chat_message(frame: &Frame, channel_name: &str) -> Result<ChatMessagePayload, String> {
    let mut body = &frame.payload;
    let mut envelope_time = None;
    if pick_str(body, &["type"]) == Some(LEGACY_CHAT_ENVELOPE) {
        envelope_time = pick_str(body, &["timestamp"]);
        body = body.get("payload").ok_or("legacy envelope without payload")?;
    }

    let text = body
        .get("text")
        .and_then(Value::as_str)
        .ok_or("missing text")?
        .to_owned();
    let sender = participant(body, "sender", &["senderId"], &["senderName"]).ok_or("missing sender")?;
    let channel = channel(body, channel_name).ok_or("missing channel")?;
    let id = pick_str(body, &["id"]).map_or_else(|| synthetic_id("msg", frame), str::to_owned);
    let sent_at = pick_str(body, &["sentAt"])
        .or(envelope_time)
        .or(frame.timestamp.as_deref())
        .unwrap_or_default()
        .to_owned();

    Ok(ChatMessagePayload { id, sender, channel, text, sent_at })
}

fn user_event(payload: &Value) -> Result<UserEventPayload, String> {
    let user = participant(payload, "user", &["userId"], &["userName"]).ok_or("missing user")?;
    let channel_id = pick_str(payload, &["channelId", "sessionId"]).unwrap_or_default().to_owned();
    Ok(UserEventPayload { user, channel_id })
}

fn error_payload(payload: &Value) -> Result<ErrorPayload, String> {
    if let Some(message) = payload.as_str() {
        return Ok(ErrorPayload { message: message.to_owned(), code: None });
    }
    let message = pick_str(payload, &["message", "error"]).ok_or("missing message")?.to_owned();
    let code = pick_str(payload, &["code"]).map(str::to_owned);
    Ok(ErrorPayload { message, code })
}

/// Reshape a recipe URL request, flat or nested.
///
/// A missing id is derived from sender, session and URL so every progress
/// and result frame for one request carries the same id.
fn recipe_request(value: &Value, frame: &Frame, channel_name: &str) -> Result<RecipeUrlRequestPayload, String> {
    let sender = participant(value, "sender", &["senderId"], &["senderName"]).ok_or("missing request sender")?;
    let url = pick_str(value, &["url"]).ok_or("missing request url")?.to_owned();
    let channel = channel(value, channel_name).unwrap_or_else(|| Channel {
        id: String::new(),
        name: channel_name.to_owned(),
    });
    let id = pick_str(value, &["id"]).map_or_else(
        || derived_id("recipe", format!("{}\n{}\n{url}", sender.id, channel.id).as_bytes()),
        str::to_owned,
    );
    let sent_at = pick_str(value, &["sentAt"])
        .or(frame.timestamp.as_deref())
        .unwrap_or_default()
        .to_owned();

    Ok(RecipeUrlRequestPayload { id, sender, channel, url, sent_at })
}

fn recipe_progress(frame: &Frame, channel_name: &str) -> Result<RecipeProgressPayload, String> {
    let payload = &frame.payload;
    let request = payload.get("request").ok_or("missing request")?;
    let phase = pick_str(payload, &["phase"]).ok_or("missing phase")?;
    Ok(RecipeProgressPayload {
        request: recipe_request(request, frame, channel_name)?,
        phase: phase.into(),
        status: pick_str(payload, &["status"]).unwrap_or_default().to_owned(),
        message: pick_str(payload, &["message"]).unwrap_or_default().to_owned(),
    })
}

/// Accepts `{status, list}` and the single-recipe `{status, recipe}` form.
fn recipe_result(frame: &Frame, channel_name: &str) -> Result<RecipeResultPayload, String> {
    let payload = &frame.payload;
    let status = ResultStatus::from(pick_str(payload, &["status"]).ok_or("missing status")?.to_owned());

    let list = match (payload.get("list"), payload.get("recipe")) {
        (Some(list), _) if !list.is_null() => decode::<Vec<Recipe>>(list, "list")?,
        (_, Some(recipe)) if !recipe.is_null() => vec![decode::<Recipe>(recipe, "recipe")?],
        _ => Vec::new(),
    };

    let request = match payload.get("request") {
        Some(request) if request.is_object() => Some(recipe_request(request, frame, channel_name)?),
        _ => None,
    };

    Ok(RecipeResultPayload { status, request, list })
}

/// Nested `{id, name}` under `nested`, else the flat id/name siblings.
fn participant(value: &Value, nested: &str, id_keys: &[&str], name_keys: &[&str]) -> Option<User> {
    if let Some(inner) = value.get(nested).filter(|v| v.is_object()) {
        let id = pick_str(inner, &["id"])?.to_owned();
        let name = pick_str(inner, &["name"]).unwrap_or_default().to_owned();
        return Some(User { id, name });
    }
    let id = pick_str(value, id_keys)?.to_owned();
    let name = pick_str(value, name_keys).unwrap_or_default().to_owned();
    Some(User { id, name })
}

/// Nested `channel`, else a channel named `channel_name` keyed by the session id.
fn channel(value: &Value, channel_name: &str) -> Option<Channel> {
    if let Some(inner) = value.get("channel").filter(|v| v.is_object()) {
        let id = pick_str(inner, &["id"]).unwrap_or_default().to_owned();
        let name = pick_str(inner, &["name"]).unwrap_or(channel_name).to_owned();
        return Some(Channel { id, name });
    }
    let id = pick_str(value, &["sessionId", "channelId"])?;
    Some(Channel { id: id.to_owned(), name: channel_name.to_owned() })
}

fn decode<T: DeserializeOwned>(value: &Value, field: &str) -> Result<T, String> {
    serde_json::from_value(value.clone()).map_err(|e| format!("invalid {field}: {e}"))
}

fn synthetic_id(prefix: &str, frame: &Frame) -> String {
    let seed = format!(
        "{}\n{}\n{}",
        frame.kind,
        frame.payload,
        frame.timestamp.as_deref().unwrap_or_default()
    );
    derived_id(prefix, seed.as_bytes())
}

fn pick_str<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str).filter(|v| !v.is_empty()))
}
