use crate::helpers::{
    TEST_AUTH_TOKEN, connect, next_event, start_test_host, start_test_host_with,
    test_messaging_config, wait_until, wait_until_within,
};

use bridge_core::error::TransportError;
use bridge_core::host::{CreatorEvent, CreatorModeState, Credentials};
use bridge_core::protocol::catalog::{
    ErrorNotice, GetPearAuth, PearAuth, ProcessLlm, SettingsTab, SubmitIdea, ThemeColors,
};
use bridge_core::protocol::{Destination, IncomingMessage};
use bridge_core::transport::connect_webview;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// **VALUE**: Verifies a webview request is answered over a real socket with its own id.
///
/// **WHY THIS MATTERS**: This is the full path the settings screen uses on load: connect,
/// request credentials, render them.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The host does not reuse the request's messageId
/// - The reader task does not feed frames into the messenger
/// - Credentials are not served from host state
#[tokio::test]
async fn given_connected_webview_when_get_pear_auth_then_receives_credentials() {
    // GIVEN: A host holding credentials and a connected settings webview
    let host = start_test_host(Credentials::new(
        Some("access".to_string()),
        Some("refresh".to_string()),
    ))
    .await;
    let webview = connect(&host, Destination::Settings).await;

    // WHEN: Requesting getPearAuth
    let auth: PearAuth = webview
        .messenger()
        .request_typed(&GetPearAuth)
        .await
        .expect("request should resolve");

    // THEN: The stored tokens come back
    assert_eq!(auth.access_token.as_deref(), Some("access"));
    assert_eq!(auth.refresh_token.as_deref(), Some("refresh"));
    assert_eq!(webview.messenger().pending_count(), 0);
}

/// **VALUE**: Verifies connections with a wrong token are refused.
///
/// **BUG THIS CATCHES**: Would catch the token check being skipped, or a rejected
/// connection still being registered as a session.
#[tokio::test]
async fn given_wrong_token_when_connect_then_fails() {
    // GIVEN: A running host
    let host = start_test_host(Credentials::default()).await;

    // WHEN: Connecting with the wrong token
    let result = connect_webview(
        host.handle.port(),
        "wrong-token",
        Destination::Creator,
        &test_messaging_config(),
    )
    .await;

    // THEN: The connection fails and no session exists
    assert!(matches!(result, Err(TransportError::Connect { .. })));
    assert_eq!(host.handle.session_count().await, 0);
}

/// **VALUE**: Verifies SubmitIdea sent over the socket reaches the editor as ExecutePlan.
#[tokio::test]
async fn given_connected_creator_when_submit_idea_then_execute_plan_event() {
    // GIVEN: A connected creator webview
    let mut host = start_test_host(Credentials::default()).await;
    let webview = connect(&host, Destination::Creator).await;

    // WHEN: Submitting an idea without waiting
    let reply = webview
        .messenger()
        .send_typed(&SubmitIdea::new("build me a todo app"), false)
        .await
        .expect("send should succeed");

    // THEN: Nothing is awaited, and the host emits state change then ExecutePlan
    assert!(reply.is_none());
    assert_eq!(
        next_event(&mut host).await,
        CreatorEvent::StateChanged(CreatorModeState::OverlayClosedCreatorActive)
    );
    match next_event(&mut host).await {
        CreatorEvent::ExecutePlan(request) => assert_eq!(request.plan, "build me a todo app"),
        other => panic!("expected ExecutePlan, got {other:?}"),
    }
}

/// **VALUE**: Verifies a failed plan resolves the waiting request with the error message.
///
/// **WHY THIS MATTERS**: The overlay awaits ProcessLLM; an `error` reply must end the wait
/// instead of leaving the overlay spinning until the timeout.
#[tokio::test]
async fn given_unconfigured_generator_when_process_llm_then_error_reply_resolves_request() {
    // GIVEN: A connected creator webview
    let host = start_test_host(Credentials::default()).await;
    let webview = connect(&host, Destination::Creator).await;

    // WHEN: Asking for a plan
    let reply = webview
        .messenger()
        .send_typed(&ProcessLlm { messages: vec![] }, true)
        .await
        .expect("request should resolve")
        .expect("reply expected");

    // THEN: The reply is the error notice
    assert_eq!(reply.message_type, "error");
    let notice: ErrorNotice = serde_json::from_value(reply.data).expect("notice should decode");
    assert!(notice.text.starts_with("Failed to create plan: "));
}

/// **VALUE**: Verifies host pings are answered automatically and counted.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The webview never answers pings
/// - The host routes pongs to handlers instead of counting them
#[tokio::test]
async fn given_connected_webview_when_ping_all_then_pong_counted() {
    // GIVEN: A connected webview
    let host = start_test_host(Credentials::default()).await;
    let _webview = connect(&host, Destination::Creator).await;

    // WHEN: Pinging all sessions
    let pinged = host.handle.ping_all().await;

    // THEN: One ping went out and one pong came back
    assert_eq!(pinged, 1);
    let handle = &host.handle;
    wait_until(move || async move { handle.pongs_received().await == 1 }).await;
}

/// **VALUE**: Verifies the heartbeat pings sessions on its own schedule.
///
/// **WHY THIS MATTERS**: Pong counts are how the editor notices a webview that stopped
/// answering; without the periodic ping nothing is ever counted.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The heartbeat task is never spawned for a non-zero interval
/// - The first tick waits for something other than the configured period
#[tokio::test]
async fn given_one_second_heartbeat_when_idle_then_pong_counted_without_ping_all() {
    // GIVEN: A host pinging every second and a connected webview
    let host = start_test_host_with(Credentials::default(), |config| {
        config.host.heartbeat_interval_secs = 1;
    })
    .await;
    let _webview = connect(&host, Destination::Creator).await;

    // WHEN: Waiting past one heartbeat period without calling ping_all
    let handle = &host.handle;

    // THEN: The webview's automatic pong is counted
    wait_until_within(Duration::from_secs(5), move || async move {
        handle.pongs_received().await >= 1
    })
    .await;
}

/// **VALUE**: Verifies host-initiated pushes reach webview listeners.
#[tokio::test]
async fn given_tab_listener_when_open_settings_tab_then_listener_receives_tab() {
    // GIVEN: A settings webview listening for tab and themeColors
    let host = start_test_host(Credentials::default()).await;
    let webview = connect(&host, Destination::Settings).await;

    let tabs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&tabs);
    webview
        .messenger()
        .register_typed::<SettingsTab, _>(move |tab, _| sink.lock().unwrap().push(tab.tab));

    let colors = Arc::new(Mutex::new(None));
    let color_sink = Arc::clone(&colors);
    webview
        .messenger()
        .register_typed::<ThemeColors, _>(move |theme, _| *color_sink.lock().unwrap() = Some(theme));

    // WHEN: The host opens the feedback tab and pushes colours
    assert_eq!(host.handle.open_settings_tab("creator-feedback").await, 1);
    let theme = ThemeColors(BTreeMap::from([(
        "--vscode-editor-background".to_string(),
        "#1e1e1e".to_string(),
    )]));
    assert_eq!(host.handle.send_theme_colors(theme.clone()).await, 1);

    // THEN: Both pushes reach the listeners
    let received = &colors;
    wait_until(move || async move { received.lock().unwrap().is_some() }).await;
    assert_eq!(*tabs.lock().unwrap(), vec!["creator-feedback".to_string()]);
    assert_eq!(colors.lock().unwrap().as_ref(), Some(&theme));
}

/// **VALUE**: Verifies undecodable frames are answered with an `error` message.
#[tokio::test]
async fn given_raw_client_when_sending_garbage_then_error_message_returned() {
    // GIVEN: A raw WebSocket client with the right token
    let host = start_test_host(Credentials::default()).await;
    let url = format!("ws://127.0.0.1:{}/?token={}", host.handle.port(), TEST_AUTH_TOKEN);
    let (mut ws, _) = connect_async(&url).await.expect("Failed to connect");

    // WHEN: Sending a frame that is not an envelope
    ws.send(Message::Text("{\"hello\":1}".into()))
        .await
        .expect("Failed to send");

    // THEN: The host answers with an uncorrelated error
    let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for reply")
        .expect("stream ended")
        .expect("read failed");
    let message: IncomingMessage =
        serde_json::from_str(frame.to_text().expect("text frame")).expect("frame should decode");
    assert_eq!(message.message_type, "error");
    assert!(message.message_id.is_none());
}

/// **VALUE**: Verifies sessions are removed when webviews disconnect, and shutdown stops
/// accepting connections.
#[tokio::test]
async fn given_connected_webview_when_dropped_and_shutdown_then_sessions_cleared() {
    // GIVEN: A connected webview
    let host = start_test_host(Credentials::default()).await;
    let webview = connect(&host, Destination::Creator).await;
    assert_eq!(host.handle.session_count().await, 1);

    // WHEN: The webview goes away
    drop(webview);

    // THEN: The session is removed
    let handle = &host.handle;
    wait_until(move || async move { handle.session_count().await == 0 }).await;

    // WHEN: The host shuts down
    let port = host.handle.port();
    host.handle.shutdown().await;

    // THEN: New connections are refused
    let result = connect_webview(port, TEST_AUTH_TOKEN, Destination::Creator, &test_messaging_config()).await;
    assert!(result.is_err());
}
