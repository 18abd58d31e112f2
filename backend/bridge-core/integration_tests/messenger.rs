use bridge_core::messenger::Messenger;
use bridge_core::protocol::catalog::SubmitIdea;
use bridge_core::protocol::{Destination, IncomingMessage};
use bridge_core::transport::ChannelTransport;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

/// **VALUE**: Verifies the creator overlay's submit flow: one fire-and-forget post.
///
/// **WHY THIS MATTERS**: The overlay closes right after submitting; the send must not
/// wait for or expect any reply.
#[tokio::test]
async fn given_creator_messenger_when_submit_idea_without_wait_then_single_post_with_uuid() {
    // GIVEN: A creator messenger over an in-process channel
    let (transport, mut rx) = ChannelTransport::new();
    let messenger = Messenger::with_defaults(Destination::Creator, Arc::new(transport));

    // WHEN: Submitting an idea without waiting
    let reply = messenger
        .send(
            "SubmitIdea",
            Some(json!({ "request": "build me a todo app" })),
            false,
        )
        .await
        .expect("send should succeed");

    // THEN: No reply, one envelope, UUID v4 id
    assert!(reply.is_none());
    let posted = rx.try_recv().expect("message should be posted");
    assert_eq!(posted.destination, Destination::Creator);
    let decoded: SubmitIdea =
        serde_json::from_value(posted.payload.expect("payload")).expect("payload should decode");
    assert_eq!(decoded.request, "build me a todo app");
    let id = uuid::Uuid::parse_str(posted.message_id.as_str()).expect("id should be a UUID");
    assert_eq!(id.get_version_num(), 4);
    assert!(rx.try_recv().is_err());
}

/// **VALUE**: Verifies a settings request with no answer fails at 10 seconds, naming the type.
#[tokio::test(start_paused = true)]
async fn given_silent_host_when_get_pear_auth_then_times_out_at_ten_seconds() {
    // GIVEN: A settings messenger whose host never answers
    let (transport, _rx) = ChannelTransport::new();
    let messenger = Messenger::with_defaults(Destination::Settings, Arc::new(transport));
    let started = tokio::time::Instant::now();

    // WHEN: Requesting getPearAuth
    let error = messenger
        .send("getPearAuth", None, true)
        .await
        .expect_err("request should time out");

    // THEN: Timeout after the 10 second window
    let text = error.to_string();
    assert!(text.contains("getPearAuth"), "error was: {text}");
    assert!(text.contains("timed out"), "error was: {text}");
    assert!(started.elapsed() >= Duration::from_secs(10));
}

/// **VALUE**: Verifies late replies after a timeout still reach listeners but resolve nothing.
#[tokio::test(start_paused = true)]
async fn given_timed_out_request_when_late_reply_arrives_then_only_listeners_fire() {
    // GIVEN: A request that already timed out, and a listener for its type
    let (transport, mut rx) = ChannelTransport::new();
    let messenger = Messenger::with_defaults(Destination::Settings, Arc::new(transport));
    let seen = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&seen);
    messenger.register("getPearAuth", move |_| *counter.lock().unwrap() += 1);

    let result = messenger.request("getPearAuth", None).await;
    assert!(result.is_err());
    let request = rx.try_recv().expect("request should be posted");

    // WHEN: The reply arrives late
    messenger.handle_incoming(IncomingMessage::reply_to(&request, "getPearAuth", json!({})));

    // THEN: The listener saw it and nothing is pending
    assert_eq!(*seen.lock().unwrap(), 1);
    assert_eq!(messenger.pending_count(), 0);
}
