pub mod config;
pub mod error;
pub mod host;
pub mod messenger;
pub mod protocol;
pub mod transport;

#[cfg(test)]
mod tests;

pub const BRIDGE_HOSTNAME: &str = "127.0.0.1";
pub const BRIDGE_BASE_URL: &str = const_format::concatcp!("ws://", BRIDGE_HOSTNAME);

/// Query parameter carrying the auth token on the WebSocket upgrade.
pub const TOKEN_QUERY_PARAM: &str = "token";
