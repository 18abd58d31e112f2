use nellie_host::app::{NellieHost, load_config};
use nellie_host::connection_info::ConnectionInfo;
use nellie_host::paths::HostPaths;

use bridge_core::config::{BridgeConfig, MessagingConfig};
use bridge_core::host::{CreatorModeState, Credentials, SubmissionCache, UnconfiguredPlanGenerator};
use bridge_core::protocol::Destination;
use bridge_core::protocol::catalog::{GetPearAuth, PearAuth, SubmitIdea};
use bridge_core::transport::connect_webview;

use std::sync::Arc;

use tempfile::TempDir;

// ============================================================================
// Integration tests for host startup wiring
// These start the real bridge host the way main() does, minus signal handling
// ============================================================================

fn test_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.host.port = 0;
    config.host.heartbeat_interval_secs = 0;
    config
}

async fn start(root: &TempDir, credentials: Credentials) -> NellieHost {
    NellieHost::start_with(
        HostPaths::under(root.path()),
        &test_config(),
        Arc::new(UnconfiguredPlanGenerator),
        credentials,
    )
    .await
    .expect("host should start")
}

/// **VALUE**: Tests that a launcher can connect using only the connection-info file.
///
/// **WHY THIS MATTERS**: The token is generated per run; the file is the only way
/// a webview learns it.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The written port is not the bound port (port 0 resolves after bind)
/// - The written token is not the one the handshake checks
/// - Startup credentials don't reach the settings handler
#[tokio::test]
async fn given_started_host_when_connecting_from_connection_file_then_request_resolves() {
    // GIVEN: A host started with credentials
    let root = TempDir::new().expect("temp dir");
    let host = start(&root, Credentials::new(Some("access".to_string()), None)).await;

    // WHEN: A webview connects with what the file says
    let info = ConnectionInfo::read(&host.paths().data_dir).expect("connection file should exist");
    assert_eq!(info.port(), host.handle().port());

    let messaging = MessagingConfig {
        response_timeout_ms: 2_000,
        connect_timeout_ms: 500,
        ..MessagingConfig::default()
    };
    let webview = connect_webview(info.port(), info.auth_token(), Destination::Settings, &messaging)
        .await
        .expect("webview should connect");

    let auth: PearAuth = webview
        .messenger()
        .request_typed(&GetPearAuth)
        .await
        .expect("request should resolve");

    // THEN: Credentials come from startup
    assert_eq!(auth.access_token.as_deref(), Some("access"));
    assert_eq!(auth.refresh_token, None);

    drop(webview);
    host.shutdown().await;
}

/// **VALUE**: Tests that a submission cached before a restart is replayed on startup.
///
/// **WHY THIS MATTERS**: Opening a new project folder restarts the editor host; the
/// overlay's request must survive that restart.
///
/// **BUG THIS CATCHES**: Would catch startup skipping the replay, or replaying
/// without clearing the cache (double execution on the next restart).
#[tokio::test]
async fn given_fresh_cached_submission_when_host_starts_then_replayed_and_cleared() {
    // GIVEN: A submission cached in the data directory
    let root = TempDir::new().expect("temp dir");
    let paths = HostPaths::under(root.path());
    paths.ensure().expect("ensure dirs");
    let cache = SubmissionCache::new(&paths.data_dir);
    cache
        .store(&SubmitIdea::new("todo app"), CreatorModeState::OverlayClosedCreatorActive)
        .await
        .expect("store should succeed");

    // WHEN: Starting the host
    let host = start(&root, Credentials::default()).await;

    // THEN: Cache is consumed and creator state restored
    assert!(!cache.path().exists(), "cache should be cleared after replay");
    assert_eq!(
        host.router().state().creator_state().await,
        CreatorModeState::OverlayClosedCreatorActive
    );

    host.shutdown().await;
}

/// **VALUE**: Tests that shutdown removes the connection file.
///
/// **BUG THIS CATCHES**: Would catch a stale file pointing launchers at a dead port.
#[tokio::test]
async fn given_running_host_when_shutdown_then_connection_file_removed() {
    let root = TempDir::new().expect("temp dir");
    let host = start(&root, Credentials::default()).await;
    let data_dir = host.paths().data_dir.clone();

    host.shutdown().await;

    assert!(ConnectionInfo::read(&data_dir).is_err());
}

/// **VALUE**: Tests that a corrupt config file falls back to defaults.
///
/// **WHY THIS MATTERS**: A hand-edited typo in bridge.json must not keep every
/// webview offline.
#[tokio::test]
async fn given_corrupt_config_file_when_load_config_then_defaults() {
    // GIVEN: Garbage in bridge.json
    let root = TempDir::new().expect("temp dir");
    let paths = HostPaths::under(root.path());
    paths.ensure().expect("ensure dirs");
    std::fs::write(paths.config_dir.join("bridge.json"), "{ nope").expect("write");

    // WHEN: Loading
    let config = load_config(&paths).expect("load_config should fall back");

    // THEN: Defaults are used
    assert_eq!(config.messaging.response_timeout_ms, BridgeConfig::default().messaging.response_timeout_ms);
}
