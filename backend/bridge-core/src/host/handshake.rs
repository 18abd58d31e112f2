//! Token check performed during the WebSocket upgrade.
//!
//! Webviews present the host's auth token as `?token=<token>` on the upgrade
//! request. A missing or wrong token is answered with HTTP 401 and the
//! connection never reaches the message loop.

use crate::TOKEN_QUERY_PARAM;

use log::warn;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// Per-connection handshake state.
pub(crate) struct HandshakeState {
    authenticated: bool,
    expected_token: String,
}

impl HandshakeState {
    pub(crate) fn new(token: String) -> Self {
        Self {
            authenticated: false,
            expected_token: token,
        }
    }

    /// Validate token and mark as authenticated if correct.
    pub(crate) fn validate_token(&mut self, token: Option<&str>) -> bool {
        match token {
            Some(token) if token == self.expected_token => {
                self.authenticated = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Upgrade callback for `accept_hdr_async`.
    pub(crate) fn check_request(
        &mut self,
        request: &Request,
        response: Response,
    ) -> Result<Response, ErrorResponse> {
        let token = request.uri().query().and_then(token_from_query);

        if self.validate_token(token.as_deref()) {
            return Ok(response);
        }

        warn!("Rejected bridge connection: missing or invalid token");
        let mut rejection = ErrorResponse::new(Some("Invalid authentication token".to_string()));
        *rejection.status_mut() = StatusCode::UNAUTHORIZED;
        Err(rejection)
    }
}

/// Extract the auth token from a raw query string.
pub(crate) fn token_from_query(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == TOKEN_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
}
