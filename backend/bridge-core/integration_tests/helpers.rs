//! Test helpers for bridge integration tests.
//!
//! - Starting a host on a free port with a fixed token
//! - Connecting webviews to it
//! - Polling host-side counters that update asynchronously

use bridge_core::config::{BridgeConfig, MessagingConfig};
use bridge_core::host::{
    BridgeHostHandle, CreatorEvent, Credentials, HostRouter, HostState, SubmissionCache,
    UnconfiguredPlanGenerator, start_bridge_host,
};
use bridge_core::protocol::Destination;
use bridge_core::transport::{WebviewConnection, connect_webview};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

pub const TEST_AUTH_TOKEN: &str = "test-token-12345";

pub struct TestHost {
    pub handle: BridgeHostHandle,
    pub events: mpsc::UnboundedReceiver<CreatorEvent>,
    pub _cache_dir: TempDir,
}

/// Start a host on a free port with [`TEST_AUTH_TOKEN`] and no heartbeat.
pub async fn start_test_host(credentials: Credentials) -> TestHost {
    start_test_host_with(credentials, |_| {}).await
}

/// Like [`start_test_host`], with `configure` applied to the config last.
pub async fn start_test_host_with<F>(credentials: Credentials, configure: F) -> TestHost
where
    F: FnOnce(&mut BridgeConfig),
{
    let cache_dir = TempDir::new().expect("temp dir");

    let mut config = BridgeConfig::default();
    config.host.port = 0;
    config.host.auth_token = Some(TEST_AUTH_TOKEN.to_string());
    config.host.heartbeat_interval_secs = 0;
    configure(&mut config);

    let (events_tx, events) = mpsc::unbounded_channel();
    let router = HostRouter::new(
        &config,
        HostState::with_credentials(credentials),
        Arc::new(UnconfiguredPlanGenerator),
        events_tx,
        SubmissionCache::new(cache_dir.path()),
    );

    let handle = start_bridge_host(&config, router)
        .await
        .expect("Failed to start bridge host");

    TestHost {
        handle,
        events,
        _cache_dir: cache_dir,
    }
}

pub fn test_messaging_config() -> MessagingConfig {
    MessagingConfig {
        response_timeout_ms: 2_000,
        connect_timeout_ms: 500,
        ..MessagingConfig::default()
    }
}

/// Connect a webview and wait until the host has registered its session.
pub async fn connect(host: &TestHost, destination: Destination) -> WebviewConnection {
    let before = host.handle.session_count().await;
    let connection = connect_webview(
        host.handle.port(),
        TEST_AUTH_TOKEN,
        destination,
        &test_messaging_config(),
    )
    .await
    .expect("Failed to connect webview");

    wait_until(move || async move { host.handle.session_count().await > before }).await;
    connection
}

/// Poll `condition` every 10ms for up to 2 seconds.
pub async fn wait_until<F, Fut>(condition: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    wait_until_within(Duration::from_secs(2), condition).await;
}

/// Poll `condition` every 10ms until `limit` elapses.
pub async fn wait_until_within<F, Fut>(limit: Duration, condition: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    while !condition().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {limit:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Next creator event, failing the test after 2 seconds.
pub async fn next_event(host: &mut TestHost) -> CreatorEvent {
    tokio::time::timeout(Duration::from_secs(2), host.events.recv())
        .await
        .expect("timed out waiting for creator event")
        .expect("event channel closed")
}
