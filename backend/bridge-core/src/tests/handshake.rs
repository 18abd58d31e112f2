// Unit tests for the upgrade-time token check

use crate::host::{HandshakeState, token_from_query};

use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

fn upgrade_request(uri: &str) -> Request {
    Request::builder()
        .uri(uri)
        .body(())
        .expect("request should build")
}

/// **VALUE**: Verifies the token is read from the query string, URL-decoded.
#[test]
fn given_query_string_when_token_from_query_then_extracts_token() {
    assert_eq!(token_from_query("token=abc").as_deref(), Some("abc"));
    assert_eq!(token_from_query("x=1&token=a%2Bb").as_deref(), Some("a+b"));
    assert_eq!(token_from_query("x=1"), None);
}

/// **VALUE**: Verifies a matching token authenticates the connection.
#[test]
fn given_correct_token_when_check_request_then_upgrade_allowed() {
    // GIVEN: A handshake expecting "secret"
    let mut state = HandshakeState::new("secret".to_string());

    // WHEN: The upgrade request carries that token
    let result = state.check_request(&upgrade_request("/?token=secret"), Response::new(()));

    // THEN: The upgrade proceeds
    assert!(result.is_ok());
    assert!(state.is_authenticated());
}

/// **VALUE**: Verifies a wrong or missing token is answered with 401.
///
/// **WHY THIS MATTERS**: Any local process can reach the loopback port; the token is the
/// only thing keeping other programs from driving the editor.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The token check is skipped when the query is missing
/// - The rejection uses a status the client treats as retryable success
#[test]
fn given_wrong_or_missing_token_when_check_request_then_unauthorized() {
    for uri in ["/?token=wrong", "/", "/?other=secret"] {
        // GIVEN: A handshake expecting "secret"
        let mut state = HandshakeState::new("secret".to_string());

        // WHEN: The request does not carry it
        let rejection = state
            .check_request(&upgrade_request(uri), Response::new(()))
            .expect_err("upgrade should be rejected");

        // THEN: 401 and not authenticated
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED, "uri: {uri}");
        assert!(!state.is_authenticated());
    }
}
