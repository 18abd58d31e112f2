//! Settings destination: account credentials for the settings screen.

use crate::error::HostError;
use crate::host::session::HostSession;
use crate::host::state::{HostState, StateCommand};
use crate::protocol::catalog::{GetPearAuth, PearAuth, UpdateCredentials};
use crate::protocol::{MessageKind, OutgoingMessage, decode_payload};

use common::RedactedToken;

use std::env;

use log::{debug, info, warn};

pub const ENV_ACCESS_TOKEN: &str = "NELLIE_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "NELLIE_REFRESH_TOKEN";

/// Stored account tokens. Never logged in clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    access_token: Option<RedactedToken>,
    refresh_token: Option<RedactedToken>,
}

impl Credentials {
    pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: non_empty(access_token),
            refresh_token: non_empty(refresh_token),
        }
    }

    /// Seed credentials from `NELLIE_ACCESS_TOKEN` / `NELLIE_REFRESH_TOKEN`.
    pub fn from_env() -> Self {
        let credentials = Self::new(env::var(ENV_ACCESS_TOKEN).ok(), env::var(ENV_REFRESH_TOKEN).ok());
        if !credentials.is_empty() {
            info!("Credentials seeded from environment");
        }
        credentials
    }

    pub fn from_wire(auth: PearAuth) -> Self {
        Self::new(auth.access_token, auth.refresh_token)
    }

    pub fn to_wire(&self) -> PearAuth {
        PearAuth {
            access_token: self.access_token.as_ref().map(|t| t.expose().to_string()),
            refresh_token: self.refresh_token.as_ref().map(|t| t.expose().to_string()),
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

fn non_empty(token: Option<String>) -> Option<RedactedToken> {
    token.filter(|t| !t.trim().is_empty()).map(RedactedToken::new)
}

/// Handles messages addressed to `settings`.
#[derive(Clone)]
pub struct SettingsHandler {
    state: HostState,
}

impl SettingsHandler {
    pub fn new(state: HostState) -> Self {
        Self { state }
    }

    pub async fn handle(&self, session: &HostSession, message: &OutgoingMessage) -> Result<(), HostError> {
        match message.message_type.as_str() {
            GetPearAuth::MESSAGE_TYPE => {
                debug!("Handling getPearAuth for session {}", session.id());
                let credentials = self.state.credentials().await;
                session.reply(message, &credentials.to_wire())
            }
            UpdateCredentials::MESSAGE_TYPE => {
                let update: UpdateCredentials =
                    decode_payload(&message.message_type, message.payload.as_ref())?;
                let credentials = Credentials::from_wire(update.0);

                let command = if credentials.is_empty() {
                    StateCommand::ClearCredentials
                } else {
                    StateCommand::SetCredentials(credentials)
                };
                self.state.update(command).await?;

                session.acknowledge(message)
            }
            other => {
                warn!("Ignoring unknown settings message type: {other}");
                Ok(())
            }
        }
    }
}
