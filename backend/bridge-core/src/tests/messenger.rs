// Unit tests for the messenger: correlation, timeouts, listener fan-out

use crate::config::{MessagingConfig, UnavailableTransportPolicy};
use crate::error::{MessengerError, TransportError};
use crate::messenger::Messenger;
use crate::protocol::catalog::{GetPearAuth, PearAuth, PlanCreationStream, SubmitIdea};
use crate::protocol::{Destination, IncomingMessage, MessageId, OutgoingMessage};
use crate::transport::{ChannelTransport, DetachedTransport};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

fn channel_messenger(destination: Destination) -> (Messenger, mpsc::UnboundedReceiver<OutgoingMessage>) {
    let (transport, rx) = ChannelTransport::new();
    (Messenger::with_defaults(destination, Arc::new(transport)), rx)
}

/// Answer the next posted message with `message_type`/`data`, reusing its id.
fn respond_once(
    messenger: &Messenger,
    mut rx: mpsc::UnboundedReceiver<OutgoingMessage>,
    message_type: &'static str,
    data: serde_json::Value,
) -> tokio::task::JoinHandle<OutgoingMessage> {
    let messenger = messenger.clone();
    tokio::spawn(async move {
        let request = rx.recv().await.expect("request should be posted");
        messenger.handle_incoming(IncomingMessage::reply_to(&request, message_type, data));
        request
    })
}

// ============================================
// SENDING
// ============================================

/// **VALUE**: Verifies fire-and-forget sends return immediately and post one tagged envelope.
///
/// **WHY THIS MATTERS**: `SubmitIdea` is fire-and-forget. The host routes on `destination`
/// and correlates on `messageId`, so both must be on every envelope.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A fire-and-forget send leaves a pending entry behind
/// - The messenger's destination is not stamped on the envelope
/// - The payload is dropped or re-shaped
#[tokio::test]
async fn given_no_wait_when_send_then_returns_none_and_posts_tagged_message() {
    // GIVEN: A creator messenger over an in-process channel
    let (messenger, mut rx) = channel_messenger(Destination::Creator);

    // WHEN: Sending SubmitIdea without waiting
    let result = messenger
        .send("SubmitIdea", Some(json!({ "request": "build me a todo app" })), false)
        .await
        .expect("send should succeed");

    // THEN: Nothing is returned and nothing is pending
    assert!(result.is_none());
    assert_eq!(messenger.pending_count(), 0);

    // THEN: Exactly one envelope was posted with destination, type, and payload
    let posted = rx.try_recv().expect("message should be posted");
    assert_eq!(posted.destination, Destination::Creator);
    assert_eq!(posted.message_type, "SubmitIdea");
    assert_eq!(posted.payload, Some(json!({ "request": "build me a todo app" })));
    assert!(uuid::Uuid::parse_str(posted.message_id.as_str()).is_ok());
    assert!(rx.try_recv().is_err(), "only one message should be posted");
}

/// **VALUE**: Verifies every send gets a fresh id.
///
/// **BUG THIS CATCHES**: Would catch ids being reused or derived from the message type,
/// which would let one reply resolve the wrong request.
#[tokio::test]
async fn given_repeated_sends_when_post_then_ids_are_unique() {
    // GIVEN: A messenger
    let (messenger, _rx) = channel_messenger(Destination::Settings);

    // WHEN: Posting the same message type many times
    let ids: std::collections::HashSet<MessageId> = (0..100)
        .map(|_| messenger.post("getPearAuth", None).expect("post should succeed"))
        .collect();

    // THEN: All ids are distinct
    assert_eq!(ids.len(), 100);
}

/// **VALUE**: Verifies a typed fire-and-forget send encodes the payload under its wire name.
#[tokio::test]
async fn given_typed_payload_when_send_typed_then_uses_message_kind_type() {
    // GIVEN: A creator messenger
    let (messenger, mut rx) = channel_messenger(Destination::Creator);

    // WHEN: Sending a typed SubmitIdea
    messenger
        .send_typed(&SubmitIdea::new("a game"), false)
        .await
        .expect("send should succeed");

    // THEN: The envelope carries the SubmitIdea wire name and camelCase payload
    let posted = rx.try_recv().expect("message should be posted");
    assert_eq!(posted.message_type, "SubmitIdea");
    assert_eq!(posted.payload, Some(json!({ "request": "a game" })));
}

// ============================================
// CORRELATION
// ============================================

/// **VALUE**: Verifies a waiting send resolves with the reply carrying its messageId.
///
/// **WHY THIS MATTERS**: This is the core request/response contract of the bridge.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Replies are matched by type instead of id
/// - The pending entry is not removed after resolution
#[tokio::test]
async fn given_wait_for_response_when_reply_arrives_then_resolves_with_reply() {
    // GIVEN: A settings messenger and a host that answers getPearAuth
    let (messenger, rx) = channel_messenger(Destination::Settings);
    let responder = respond_once(
        &messenger,
        rx,
        "getPearAuth",
        json!({ "accessToken": "a", "refreshToken": "r" }),
    );

    // WHEN: Requesting getPearAuth
    let reply = messenger
        .send("getPearAuth", None, true)
        .await
        .expect("request should resolve")
        .expect("waiting send should return the reply");

    // THEN: The reply is the correlated message
    let request = responder.await.expect("responder should finish");
    assert_eq!(reply.message_id, Some(request.message_id));
    assert_eq!(reply.data["accessToken"], "a");
    assert_eq!(messenger.pending_count(), 0);
}

/// **VALUE**: Verifies typed requests decode the reply's `data`.
#[tokio::test]
async fn given_typed_request_when_reply_arrives_then_decodes_data() {
    // GIVEN: A host that answers with tokens
    let (messenger, rx) = channel_messenger(Destination::Settings);
    let _responder = respond_once(&messenger, rx, "getPearAuth", json!({ "accessToken": "tok" }));

    // WHEN: Requesting PearAuth
    let auth: PearAuth = messenger
        .request_typed(&GetPearAuth)
        .await
        .expect("request should resolve");

    // THEN: The tokens are decoded
    assert_eq!(auth.access_token.as_deref(), Some("tok"));
    assert_eq!(auth.refresh_token, None);
}

/// **VALUE**: Verifies unanswered requests fail after the default 10 second window.
///
/// **WHY THIS MATTERS**: Callers awaiting a reply must not hang forever when the host
/// never answers.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The timeout is missing or uses the wrong default
/// - The error text does not name the message type
/// - Timed-out entries stay in the pending map
#[tokio::test(start_paused = true)]
async fn given_no_reply_when_waiting_then_times_out_after_ten_seconds() {
    // GIVEN: A messenger whose host never answers
    let (messenger, _rx) = channel_messenger(Destination::Settings);
    let started = tokio::time::Instant::now();

    // WHEN: Requesting getPearAuth
    let error = messenger
        .send("getPearAuth", None, true)
        .await
        .expect_err("request should time out");

    // THEN: It failed with a timeout naming the type after 10 seconds
    assert!(error.is_timeout());
    assert!(error.to_string().contains("getPearAuth"));
    assert!(error.to_string().contains("timed out"));
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert!(started.elapsed() < Duration::from_secs(11));
    assert_eq!(messenger.pending_count(), 0);
}

/// **VALUE**: Verifies replies with a different id do not resolve a request.
#[tokio::test(start_paused = true)]
async fn given_reply_with_other_id_when_waiting_then_still_times_out() {
    // GIVEN: A host that replies with an unrelated id
    let (messenger, mut rx) = channel_messenger(Destination::Settings);
    let host = messenger.clone();
    tokio::spawn(async move {
        let _request = rx.recv().await;
        host.handle_incoming(IncomingMessage {
            message_type: "getPearAuth".to_string(),
            data: json!({}),
            message_id: Some(MessageId::from("some-other-id")),
        });
    });

    // WHEN: Requesting
    let result = messenger.request("getPearAuth", None).await;

    // THEN: The request times out
    assert!(matches!(result, Err(MessengerError::Timeout { .. })));
}

/// **VALUE**: Verifies a caller that stops waiting leaves no pending entry behind.
///
/// **BUG THIS CATCHES**: Would catch pending entries leaking when the awaiting future
/// is dropped before the reply or the timeout.
#[tokio::test(start_paused = true)]
async fn given_abandoned_request_when_future_dropped_then_pending_entry_removed() {
    // GIVEN: A messenger whose host never answers
    let (messenger, _rx) = channel_messenger(Destination::Settings);

    // WHEN: The caller gives up after one second
    let outcome = tokio::time::timeout(Duration::from_secs(1), messenger.request("getPearAuth", None)).await;

    // THEN: The request future was dropped and its entry removed
    assert!(outcome.is_err());
    assert_eq!(messenger.pending_count(), 0);
}

// ============================================
// TRANSPORT POLICY
// ============================================

/// **VALUE**: Verifies the default policy drops messages when no host channel exists.
///
/// **WHY THIS MATTERS**: The webview can run outside its host (e.g. in a browser during
/// development); sends must not error in that case.
#[tokio::test]
async fn given_detached_transport_and_ignore_policy_when_post_then_succeeds() {
    // GIVEN: A messenger with no host channel
    let messenger = Messenger::with_defaults(Destination::Creator, Arc::new(DetachedTransport));

    // WHEN: Posting
    let result = messenger.post("Close", None);

    // THEN: The message is silently dropped
    assert!(result.is_ok());
}

/// **VALUE**: Verifies the `fail` policy surfaces the unavailable transport.
#[tokio::test]
async fn given_detached_transport_and_fail_policy_when_post_then_returns_unavailable() {
    // GIVEN: A messenger configured to fail on a missing host channel
    let config = MessagingConfig {
        unavailable_transport: UnavailableTransportPolicy::Fail,
        ..MessagingConfig::default()
    };
    let messenger = Messenger::new(Destination::Creator, Arc::new(DetachedTransport), &config);

    // WHEN: Requesting
    let error = messenger
        .request("getPearAuth", None)
        .await
        .expect_err("request should fail");

    // THEN: The transport error is surfaced and nothing is left pending
    assert!(matches!(
        error,
        MessengerError::Transport(TransportError::Unavailable { .. })
    ));
    assert_eq!(messenger.pending_count(), 0);
}

// ============================================
// LISTENERS
// ============================================

/// **VALUE**: Verifies listeners for a type run in registration order.
#[tokio::test]
async fn given_two_listeners_when_message_arrives_then_both_run_in_order() {
    // GIVEN: Two listeners for planCreationStream
    let (messenger, _rx) = channel_messenger(Destination::Creator);
    let calls = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&calls);
    messenger.register("planCreationStream", move |_| first.lock().unwrap().push("first"));
    let second = Arc::clone(&calls);
    messenger.register("planCreationStream", move |_| second.lock().unwrap().push("second"));

    // WHEN: One message of that type arrives
    messenger.handle_incoming(IncomingMessage::broadcast(
        "planCreationStream",
        json!({ "plan": "step 1" }),
    ));

    // THEN: Each listener ran once, in order
    assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
}

/// **VALUE**: Verifies a reply both resolves its request and reaches type listeners.
///
/// **WHY THIS MATTERS**: Screens listen for `getPearAuth` while another caller awaits it;
/// both must see the same message.
#[tokio::test]
async fn given_listener_and_pending_request_when_reply_arrives_then_both_fire() {
    // GIVEN: A listener for getPearAuth and a host that answers
    let (messenger, rx) = channel_messenger(Destination::Settings);
    let seen = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&seen);
    messenger.register("getPearAuth", move |_| *counter.lock().unwrap() += 1);
    let _responder = respond_once(&messenger, rx, "getPearAuth", json!({}));

    // WHEN: Requesting getPearAuth
    let reply = messenger.request("getPearAuth", None).await;

    // THEN: The request resolved and the listener fired once
    assert!(reply.is_ok());
    assert_eq!(*seen.lock().unwrap(), 1);
}

/// **VALUE**: Verifies unregistering removes exactly one callback, and twice is a no-op.
#[tokio::test]
async fn given_registered_listener_when_unregistered_twice_then_second_is_noop() {
    // GIVEN: Two listeners for the same type
    let (messenger, _rx) = channel_messenger(Destination::Creator);
    let calls = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&calls);
    let subscription = messenger.register("tab", move |_| first.lock().unwrap().push("first"));
    let second = Arc::clone(&calls);
    messenger.register("tab", move |_| second.lock().unwrap().push("second"));

    // WHEN: Unregistering the first one twice
    assert!(subscription.unregister());
    assert!(!subscription.unregister());

    // THEN: Only the second listener remains
    assert_eq!(messenger.listener_count("tab"), 1);
    messenger.handle_incoming(IncomingMessage::broadcast("tab", json!({ "tab": "x" })));
    assert_eq!(*calls.lock().unwrap(), vec!["second"]);
}

/// **VALUE**: Verifies unregistering by id through the messenger.
#[tokio::test]
async fn given_listener_id_when_unregister_on_messenger_then_removed() {
    // GIVEN: A single listener
    let (messenger, _rx) = channel_messenger(Destination::Creator);
    let subscription = messenger.register("themeColors", |_| {});

    // WHEN / THEN: Removing it by id works once
    assert!(messenger.unregister("themeColors", subscription.id()));
    assert!(!messenger.unregister("themeColors", subscription.id()));
    assert_eq!(messenger.listener_count("themeColors"), 0);
}

/// **VALUE**: Verifies a listener may unregister itself while being dispatched.
///
/// **BUG THIS CATCHES**: Would catch the registry lock being held during callbacks,
/// which deadlocks on re-entrant registration changes.
#[tokio::test]
async fn given_listener_that_unregisters_itself_when_dispatched_then_no_deadlock() {
    // GIVEN: A listener that removes itself on first call
    let (messenger, _rx) = channel_messenger(Destination::Creator);
    let calls = Arc::new(Mutex::new(0));
    let slot: Arc<Mutex<Option<crate::messenger::Subscription>>> = Arc::new(Mutex::new(None));

    let counter = Arc::clone(&calls);
    let own = Arc::clone(&slot);
    let subscription = messenger.register("error", move |_| {
        *counter.lock().unwrap() += 1;
        if let Some(subscription) = own.lock().unwrap().take() {
            subscription.unregister();
        }
    });
    *slot.lock().unwrap() = Some(subscription);

    // WHEN: Two messages arrive
    messenger.handle_incoming(IncomingMessage::broadcast("error", json!({ "text": "a" })));
    messenger.handle_incoming(IncomingMessage::broadcast("error", json!({ "text": "b" })));

    // THEN: It ran only for the first message
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(messenger.listener_count("error"), 0);
}

/// **VALUE**: Verifies typed listeners decode data and skip undecodable messages.
#[tokio::test]
async fn given_typed_listener_when_messages_arrive_then_decodes_valid_ones() {
    // GIVEN: A typed listener for planCreationStream
    let (messenger, _rx) = channel_messenger(Destination::Creator);
    let plans = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&plans);
    messenger.register_typed::<PlanCreationStream, _>(move |stream, _| {
        sink.lock().unwrap().push(stream.plan);
    });

    // WHEN: One valid and one malformed message arrive
    messenger.handle_incoming(IncomingMessage::broadcast(
        "planCreationStream",
        json!({ "plan": "draft" }),
    ));
    messenger.handle_incoming(IncomingMessage::broadcast("planCreationStream", json!(42)));

    // THEN: Only the valid one was delivered
    assert_eq!(*plans.lock().unwrap(), vec!["draft".to_string()]);
}

// ============================================
// PING / RAW FRAMES
// ============================================

/// **VALUE**: Verifies `ping` is answered with one `pong` and never reaches listeners.
///
/// **WHY THIS MATTERS**: The host uses ping/pong to check the webview is alive.
#[tokio::test]
async fn given_ping_when_handled_then_posts_pong_and_skips_listeners() {
    // GIVEN: A messenger with a ping listener
    let (messenger, mut rx) = channel_messenger(Destination::Creator);
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    messenger.register("ping", move |_| *counter.lock().unwrap() += 1);

    // WHEN: The host pings
    messenger.handle_incoming(IncomingMessage::broadcast("ping", serde_json::Value::Null));

    // THEN: Exactly one pong was posted and the listener did not run
    let pong = rx.try_recv().expect("pong should be posted");
    assert_eq!(pong.message_type, "pong");
    assert_eq!(pong.payload, None);
    assert!(rx.try_recv().is_err());
    assert_eq!(*calls.lock().unwrap(), 0);
}

/// **VALUE**: Verifies raw frames are decoded, including the `payload` spelling of `data`.
#[tokio::test]
async fn given_raw_frame_with_payload_key_when_handle_raw_then_listener_sees_data() {
    // GIVEN: A listener for tab
    let (messenger, _rx) = channel_messenger(Destination::Settings);
    let tabs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&tabs);
    messenger.register("tab", move |message| sink.lock().unwrap().push(message.data.clone()));

    // WHEN: The host pushes a tab message using `payload`
    messenger
        .handle_raw(r#"{"messageType":"tab","payload":{"tab":"creator-feedback"}}"#)
        .expect("frame should decode");

    // THEN: The listener received the payload as data
    assert_eq!(*tabs.lock().unwrap(), vec![json!({ "tab": "creator-feedback" })]);
}

/// **VALUE**: Verifies malformed frames are reported instead of dispatched.
#[tokio::test]
async fn given_malformed_frame_when_handle_raw_then_returns_error() {
    // GIVEN: A messenger
    let (messenger, _rx) = channel_messenger(Destination::Creator);

    // WHEN / THEN: Decoding a frame without messageType fails
    assert!(messenger.handle_raw(r#"{"data":1}"#).is_err());
    assert!(messenger.handle_raw("not json").is_err());
}
