use crate::helpers::{
    TEST_AUTH_TOKEN, start_test_host, start_test_host_with, test_messaging_config, wait_until,
};

use bridge_core::config::{MessagingConfig, UnavailableTransportPolicy};
use bridge_core::error::{MessengerError, TransportError};
use bridge_core::host::Credentials;
use bridge_core::protocol::Destination;
use bridge_core::protocol::catalog::{GetPearAuth, PearAuth};
use bridge_core::transport::connect_webview;

use std::time::Duration;

fn fail_fast_config() -> MessagingConfig {
    MessagingConfig {
        unavailable_transport: UnavailableTransportPolicy::Fail,
        ..test_messaging_config()
    }
}

/// **VALUE**: Verifies a webview whose host went away reports an unavailable transport.
///
/// **WHY THIS MATTERS**: Under the `fail` policy callers rely on an immediate error to
/// show "editor disconnected" instead of waiting out the response timeout.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Posts keep queueing into a socket the host already closed
/// - Requests time out instead of failing fast after the close
#[tokio::test]
async fn given_fail_policy_when_host_shuts_down_then_post_and_request_unavailable() {
    // GIVEN: A settings webview connected with the fail policy
    let host = start_test_host(Credentials::default()).await;
    let webview = connect_webview(
        host.handle.port(),
        TEST_AUTH_TOKEN,
        Destination::Settings,
        &fail_fast_config(),
    )
    .await
    .expect("webview should connect");
    let handle = &host.handle;
    wait_until(move || async move { handle.session_count().await == 1 }).await;

    // WHEN: The host shuts down and the webview notices the close
    host.handle.shutdown().await;
    let connection = &webview;
    wait_until(move || async move { !connection.is_open() }).await;

    // THEN: Posting fails with Unavailable
    let posted = webview.messenger().post("getPearAuth", None);
    assert!(
        matches!(posted, Err(MessengerError::Transport(TransportError::Unavailable { .. }))),
        "expected unavailable transport, got {posted:?}"
    );

    // AND: A request fails the same way without waiting for its timeout
    let started = tokio::time::Instant::now();
    let requested = webview.messenger().request_typed::<_, PearAuth>(&GetPearAuth).await;
    assert!(matches!(
        requested,
        Err(MessengerError::Transport(TransportError::Unavailable { .. }))
    ));
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(webview.messenger().pending_count(), 0);
}

/// **VALUE**: Verifies the connect retries until the host starts listening.
///
/// **WHY THIS MATTERS**: Webviews are often launched alongside the editor host and may
/// dial the port before it is bound.
///
/// **BUG THIS CATCHES**: Would catch the first refused connection being treated as final,
/// or the backoff giving up before `connect_timeout_ms`.
#[tokio::test]
async fn given_host_not_yet_listening_when_connect_webview_then_retries_until_host_starts() {
    // GIVEN: A free port nobody listens on yet
    let port = {
        let reserved = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
        reserved.local_addr().expect("local addr").port()
    };

    let config = MessagingConfig {
        connect_timeout_ms: 5_000,
        ..test_messaging_config()
    };

    // WHEN: The webview starts dialing before the host binds the port
    let dialing = tokio::spawn(async move {
        connect_webview(port, TEST_AUTH_TOKEN, Destination::Settings, &config).await
    });
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!dialing.is_finished(), "connect should still be retrying");

    let host = start_test_host_with(Credentials::new(Some("late".to_string()), None), |config| {
        config.host.port = port;
    })
    .await;

    // THEN: The connect succeeds and the connection is usable
    let webview = tokio::time::timeout(Duration::from_secs(6), dialing)
        .await
        .expect("connect should finish within the connect timeout")
        .expect("connect task should not panic")
        .expect("webview should connect once the host listens");

    let auth: PearAuth = webview
        .messenger()
        .request_typed(&GetPearAuth)
        .await
        .expect("request should resolve");
    assert_eq!(auth.access_token.as_deref(), Some("late"));
    drop(host);
}
