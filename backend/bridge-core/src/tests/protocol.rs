// Unit tests for wire envelopes and the typed catalog

use crate::protocol::catalog::{
    ChatMessage, CloseOverlay, MessageContent, PearAuth, ProcessLlm, SubmitIdea,
};
use crate::protocol::{
    Destination, IncomingMessage, MessageId, OutgoingMessage, decode_payload, encode_payload,
};

use serde_json::json;

// ============================================
// ENVELOPES
// ============================================

/// **VALUE**: Verifies the webview → host envelope uses the camelCase wire names.
///
/// **WHY THIS MATTERS**: The host reads `messageId`, `destination`, `messageType` and
/// `payload` by those exact keys.
///
/// **BUG THIS CATCHES**: Would catch a missing `rename_all`, an uppercase destination,
/// or `payload: null` being sent for payload-less messages.
#[test]
fn given_outgoing_message_when_serialized_then_uses_wire_names() {
    // GIVEN: A payload-less settings message with a known id
    let mut message = OutgoingMessage::new(Destination::Settings, "getPearAuth", None);
    message.message_id = MessageId::from("id-1");

    // WHEN: Serializing
    let value = serde_json::to_value(&message).expect("message should serialize");

    // THEN: Keys and values match the wire format
    assert_eq!(
        value,
        json!({ "messageId": "id-1", "destination": "settings", "messageType": "getPearAuth" })
    );
}

/// **VALUE**: Verifies the host → webview envelope tolerates missing `data` and `messageId`.
#[test]
fn given_minimal_incoming_frame_when_decoded_then_defaults_apply() {
    // GIVEN: A frame with only a type
    let frame = r#"{"messageType":"ping"}"#;

    // WHEN: Decoding
    let message: IncomingMessage = serde_json::from_str(frame).expect("frame should decode");

    // THEN: Data is null and there is no correlation id
    assert_eq!(message.message_type, "ping");
    assert!(message.data.is_null());
    assert!(message.message_id.is_none());
}

/// **VALUE**: Verifies replies copy the request's id.
#[test]
fn given_request_when_reply_to_then_reuses_message_id() {
    // GIVEN: A request
    let request = OutgoingMessage::new(Destination::Creator, "ProcessLLM", None);

    // WHEN: Building a reply
    let reply = IncomingMessage::reply_to(&request, "planCreationCompleted", json!({ "plan": "p" }));

    // THEN: The ids match
    assert_eq!(reply.message_id, Some(request.message_id));
}

// ============================================
// PAYLOADS
// ============================================

/// **VALUE**: Verifies unit payloads are omitted rather than sent as `null`.
#[test]
fn given_unit_payload_when_encoded_then_none() {
    assert_eq!(encode_payload(&CloseOverlay).expect("encode should succeed"), None);
}

/// **VALUE**: Verifies SubmitIdea keeps unknown overlay fields.
///
/// **WHY THIS MATTERS**: The editor executes the plan with everything the overlay sent;
/// dropping fields would lose context the overlay attached.
#[test]
fn given_submit_idea_with_extra_fields_when_decoded_then_extra_preserved() {
    // GIVEN: A SubmitIdea payload with an extra field
    let payload = json!({
        "request": "build me a todo app",
        "newProjectType": "WEBAPP",
        "newProjectPath": "~/projects/todo",
        "attachments": ["a.png"]
    });

    // WHEN: Decoding
    let idea: SubmitIdea = decode_payload("SubmitIdea", Some(&payload)).expect("payload should decode");

    // THEN: Known fields are typed and the extra field is kept
    assert_eq!(idea.request, "build me a todo app");
    assert_eq!(idea.new_project_path(), Some("~/projects/todo"));
    assert_eq!(idea.extra.get("attachments"), Some(&json!(["a.png"])));
}

/// **VALUE**: Verifies when a submission counts as a new-project request.
#[test]
fn given_project_type_none_or_empty_path_when_new_project_path_then_none() {
    // GIVEN: Submissions that must not create a project
    let mut none_type = SubmitIdea::new("x");
    none_type.new_project_type = Some("NONE".to_string());
    none_type.new_project_path = Some("/tmp/x".to_string());

    let mut empty_path = SubmitIdea::new("x");
    empty_path.new_project_type = Some("WEBAPP".to_string());
    empty_path.new_project_path = Some(String::new());

    // THEN: Neither asks for a project folder
    assert_eq!(none_type.new_project_path(), None);
    assert_eq!(empty_path.new_project_path(), None);
    assert_eq!(SubmitIdea::new("x").new_project_path(), None);
}

/// **VALUE**: Verifies chat content accepts both plain strings and text parts.
#[test]
fn given_mixed_content_when_decoded_then_text_extracted() {
    // GIVEN: A ProcessLLM payload with both content shapes
    let payload = json!({
        "messages": [
            { "role": "user", "content": "hello" },
            { "role": "assistant", "content": [
                { "type": "text", "text": "plan " },
                { "type": "image_url" },
                { "type": "text", "text": "ready" }
            ]}
        ]
    });

    // WHEN: Decoding
    let request: ProcessLlm = decode_payload("ProcessLLM", Some(&payload)).expect("payload should decode");

    // THEN: Both shapes yield their text
    assert_eq!(request.messages[0], ChatMessage::user("hello"));
    assert!(matches!(request.messages[1].content, MessageContent::Parts(_)));
    assert_eq!(request.messages[1].content.text(), "plan ready");
}

/// **VALUE**: Verifies a payload of the wrong shape names the message type in the error.
#[test]
fn given_wrong_shape_when_decode_payload_then_error_names_type() {
    let error = decode_payload::<ProcessLlm>("ProcessLLM", Some(&json!({ "messages": 3 })))
        .expect_err("decode should fail");

    assert!(error.to_string().contains("ProcessLLM"));
}

/// **VALUE**: Verifies tokens never appear in Debug output.
#[test]
fn given_pear_auth_when_debug_formatted_then_tokens_redacted() {
    // GIVEN: Tokens
    let auth = PearAuth {
        access_token: Some("secret-access".to_string()),
        refresh_token: Some("secret-refresh".to_string()),
    };

    // WHEN: Formatting for logs
    let debug = format!("{auth:?}");

    // THEN: Neither token is visible
    assert!(!debug.contains("secret-access"));
    assert!(!debug.contains("secret-refresh"));
    assert!(debug.contains("[REDACTED]"));
}
