use super::*;

fn ann() -> User {
    User { id: "u1".to_owned(), name: "Ann".to_owned() }
}

fn stamp() -> Stamp {
    Stamp { id: "msg-1".to_owned(), sent_at: "2024-05-01T12:00:00Z".to_owned() }
}

fn general() -> Channel {
    Channel { id: "s1".to_owned(), name: "General".to_owned() }
}

#[test]
fn chat_message_is_completed_from_draft_and_stamp() {
    let draft = ChatDraft { channel: general(), text: "  hello  ".to_owned() };
    let message = build_chat_message(draft, &ann(), stamp()).unwrap();
    assert_eq!(message.id, "msg-1");
    assert_eq!(message.sender, ann());
    assert_eq!(message.channel, general());
    assert_eq!(message.text, "  hello  ");
    assert_eq!(message.sent_at, "2024-05-01T12:00:00Z");
}

#[test]
fn blank_chat_message_is_rejected() {
    let draft = ChatDraft { channel: general(), text: " \n ".to_owned() };
    assert_eq!(build_chat_message(draft, &ann(), stamp()), Err(CommandError::EmptyMessage));
}

#[test]
fn chat_command_payload_uses_nested_wire_shape() {
    let draft = ChatDraft { channel: general(), text: "hi".to_owned() };
    let command = OutboundCommand::ChatMessage(build_chat_message(draft, &ann(), stamp()).unwrap());
    assert_eq!(command.wire_type(), "CHAT_MESSAGE");
    assert_eq!(
        command.payload().unwrap(),
        serde_json::json!({
            "id": "msg-1",
            "sender": { "id": "u1", "name": "Ann" },
            "channel": { "id": "s1", "name": "General" },
            "text": "hi",
            "sentAt": "2024-05-01T12:00:00Z",
        })
    );
}

#[test]
fn recipe_submission_is_flattened_on_the_wire() {
    let submission = build_recipe_submission(" http://x/soup ", &ann(), "s1", "General", stamp()).unwrap();
    assert_eq!(submission.request.url, "http://x/soup");
    assert_eq!(submission.request.channel, general());
    assert_eq!(submission.request.id, "msg-1");

    let command = OutboundCommand::RecipeUrlRequest(submission.wire);
    assert_eq!(command.wire_type(), "RECIPE_URL_REQUEST");
    assert_eq!(
        command.payload().unwrap(),
        serde_json::json!({ "senderId": "u1", "senderName": "Ann", "sessionId": "s1", "url": "http://x/soup" })
    );
}

#[test]
fn recipe_submission_requires_url_and_session() {
    assert_eq!(
        build_recipe_submission("  ", &ann(), "s1", "General", stamp()),
        Err(CommandError::EmptyUrl)
    );
    assert_eq!(
        build_recipe_submission("http://x", &ann(), "", "General", stamp()),
        Err(CommandError::NoSession)
    );
}

#[test]
fn identify_command_payload() {
    let command = OutboundCommand::UserIdentify(IdentifyPayload::from(&ann()));
    assert_eq!(command.wire_type(), "USER_IDENTIFY");
    assert_eq!(command.payload().unwrap(), serde_json::json!({ "userId": "u1", "userName": "Ann" }));
}

#[test]
fn stamps_are_unique_and_prefixed() {
    let one = Stamp::now("msg");
    let two = Stamp::now("msg");
    assert!(one.id.starts_with("msg-"));
    assert_ne!(one.id, two.id);
    assert!(one.sent_at.ends_with('Z'));
}
