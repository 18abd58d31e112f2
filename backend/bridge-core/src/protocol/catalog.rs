//! Typed payloads for every message type the bridge knows about.
//!
//! Each payload names its wire `messageType` through [`MessageKind`], so
//! senders and listeners never spell the string by hand.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Binds a payload type to its wire `messageType`.
pub trait MessageKind {
    const MESSAGE_TYPE: &'static str;
}

// ============================================
// WEBVIEW → HOST
// ============================================

/// Creator overlay submission ("build me a todo app").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitIdea {
    pub request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_project_path: Option<String>,
    /// Any other fields the overlay attached; forwarded untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MessageKind for SubmitIdea {
    const MESSAGE_TYPE: &'static str = "SubmitIdea";
}

/// Project type the overlay sends when no new project should be created.
pub const NO_PROJECT_TYPE: &str = "NONE";

impl SubmitIdea {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            new_project_type: None,
            new_project_path: None,
            extra: Map::new(),
        }
    }

    /// Path of the project folder to create, if this submission asks for one.
    pub fn new_project_path(&self) -> Option<&str> {
        let path = self.new_project_path.as_deref().filter(|p| !p.is_empty())?;
        match self.new_project_type.as_deref() {
            Some(NO_PROJECT_TYPE) => None,
            _ => Some(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Chat content: plain text or a list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

impl MessageContent {
    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text.as_deref())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: MessageContent::Text(text.into()),
        }
    }
}

/// Ask the host to draft a plan from the conversation so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessLlm {
    pub messages: Vec<ChatMessage>,
}

impl MessageKind for ProcessLlm {
    const MESSAGE_TYPE: &'static str = "ProcessLLM";
}

/// Close the creator overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOverlay;

impl MessageKind for CloseOverlay {
    const MESSAGE_TYPE: &'static str = "Close";
}

/// Automatic answer to a host `ping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong;

impl MessageKind for Pong {
    const MESSAGE_TYPE: &'static str = super::PONG_MESSAGE_TYPE;
}

/// Request the signed-in account's tokens. Answered with [`PearAuth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPearAuth;

impl MessageKind for GetPearAuth {
    const MESSAGE_TYPE: &'static str = "getPearAuth";
}

/// Account tokens on the wire.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PearAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for PearAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PearAuth")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl MessageKind for PearAuth {
    const MESSAGE_TYPE: &'static str = GetPearAuth::MESSAGE_TYPE;
}

/// Replace the stored account tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateCredentials(pub PearAuth);

impl MessageKind for UpdateCredentials {
    const MESSAGE_TYPE: &'static str = "updateNellieCredentials";
}

// ============================================
// HOST → WEBVIEW
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping;

impl MessageKind for Ping {
    const MESSAGE_TYPE: &'static str = super::PING_MESSAGE_TYPE;
}

/// Accumulated plan text so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCreationStream {
    pub plan: String,
}

impl MessageKind for PlanCreationStream {
    const MESSAGE_TYPE: &'static str = "planCreationStream";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCreationCompleted {
    pub plan: String,
}

impl MessageKind for PlanCreationCompleted {
    const MESSAGE_TYPE: &'static str = "planCreationCompleted";
}

/// Human-readable failure pushed to the webview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub text: String,
}

impl MessageKind for ErrorNotice {
    const MESSAGE_TYPE: &'static str = "error";
}

/// Switch the settings screen to a tab (e.g. `creator-feedback`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsTab {
    pub tab: String,
}

impl MessageKind for SettingsTab {
    const MESSAGE_TYPE: &'static str = "tab";
}

/// Editor theme colours keyed by CSS variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeColors(pub BTreeMap<String, String>);

impl MessageKind for ThemeColors {
    const MESSAGE_TYPE: &'static str = "themeColors";
}
