// Unit tests for error module
// Tests error serialization and conversions from bridge-core errors

use crate::error::NellieHostError;

use bridge_core::error::{ConfigError, HostError};

/// **VALUE**: Tests that errors serialize as tagged JSON.
///
/// **WHY THIS MATTERS**: A supervising process reads startup failures as structured
/// JSON; if serialization breaks it only sees opaque text.
///
/// **BUG THIS CATCHES**: Would catch if someone removes the `#[derive(Serialize)]`
/// or changes the `type`/`data` tagging.
#[test]
fn given_nellie_host_error_when_serialized_then_tagged_json() {
    // GIVEN: An app error
    let err = NellieHostError::app("Test");

    // WHEN: Serializing to JSON
    let value = serde_json::to_value(&err).expect("error should serialize");

    // THEN: Variant name and message are present
    assert_eq!(value["type"], "App");
    assert_eq!(value["data"]["message"], "Test");
}

/// **VALUE**: Verifies `?` on bridge-core errors lands in the matching variant.
///
/// **BUG THIS CATCHES**: Would catch config failures being reported as bridge failures,
/// which points users at the wrong fix.
#[test]
fn given_core_errors_when_converted_then_matching_variant() {
    // GIVEN: One config and one host error
    let config_error = ConfigError::validation("bad timeout");
    let host_error = HostError::plan("planner down");

    // WHEN: Converting
    let from_config = NellieHostError::from(config_error);
    let from_host = NellieHostError::from(host_error);

    // THEN: Each keeps its message in its own variant
    assert!(matches!(&from_config, NellieHostError::Config { message, .. } if message.contains("bad timeout")));
    assert!(matches!(&from_host, NellieHostError::Bridge { message, .. } if message.contains("planner down")));
}
