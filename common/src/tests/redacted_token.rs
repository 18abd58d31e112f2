// Unit tests for credential redaction

use crate::RedactedToken;

/// **VALUE**: Verifies that Debug output never contains the token value.
///
/// **WHY THIS MATTERS**: Credentials flow through structs that get logged with `{:?}`.
/// A derived Debug would print the access token into the log file.
///
/// **BUG THIS CATCHES**: Would catch if someone replaces the manual Debug impl with a derive.
#[test]
fn given_token_when_debug_formatted_then_value_is_hidden() {
    // GIVEN: A token with a recognisable value
    let token = RedactedToken::new("pear-secret-value");

    // WHEN: Formatting with Debug and Display
    let debug = format!("{token:?}");
    let display = format!("{token}");

    // THEN: Neither output leaks the value
    assert!(!debug.contains("pear-secret-value"));
    assert!(!display.contains("pear-secret-value"));
    assert!(debug.contains("17 chars"), "Debug should report length only");
}

/// **VALUE**: Verifies that serializing a token fails loudly.
///
/// **WHY THIS MATTERS**: Wire payloads must opt in to sending a token via `expose()`.
/// Accidental `#[derive(Serialize)]` on a struct holding a token must not leak it.
///
/// **BUG THIS CATCHES**: Would catch if the Serialize impl starts emitting the inner string.
#[test]
fn given_token_when_serialized_then_returns_error() {
    // GIVEN: A token
    let token = RedactedToken::new("abc");

    // WHEN: Serializing to JSON
    let result = serde_json::to_string(&token);

    // THEN: Serialization is refused
    assert!(result.is_err(), "RedactedToken must not serialize");
}

#[test]
fn given_token_when_exposed_then_returns_original_value() {
    let token = RedactedToken::new("abc");

    assert_eq!(token.expose(), "abc");
    assert_eq!(token.len(), 3);
    assert!(!token.is_empty());
}
