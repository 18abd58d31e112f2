//! Creator destination: plan drafting and idea submission from the overlay.
//!
//! # Messages
//!
//! - `ProcessLLM` - stream a plan from the [`PlanGenerator`]; the webview gets
//!   the accumulated text as `planCreationStream` after every chunk, then
//!   `planCreationCompleted`. Failures become an `error` message.
//! - `SubmitIdea` - close the overlay with the creator active, then either
//!   start a new project (cache the submission, create the folder, replace the
//!   workspace) or ask the editor to execute the plan directly.
//! - `Close` - close the overlay.
//!
//! Side effects the editor must act on are emitted as [`CreatorEvent`]s.

mod cache;

pub use cache::{CACHE_FILE_NAME, CachedSubmission, SubmissionCache};

use crate::error::HostError;
use crate::host::session::HostSession;
use crate::host::state::{HostState, StateCommand};
use crate::protocol::catalog::{
    ChatMessage, CloseOverlay, ErrorNotice, PlanCreationCompleted, PlanCreationStream, ProcessLlm,
    SubmitIdea,
};
use crate::protocol::{MessageKind, OutgoingMessage, decode_payload};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Where the creator overlay is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreatorModeState {
    OverlayOpen,
    #[default]
    OverlayClosed,
    /// Overlay dismissed while the creator keeps working on a submission.
    OverlayClosedCreatorActive,
}

/// Produces plan text in chunks for a conversation.
pub trait PlanGenerator: Send + Sync {
    fn generate(&self, messages: Vec<ChatMessage>) -> BoxStream<'static, Result<String, HostError>>;
}

/// Generator used when no model backend is wired in; every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredPlanGenerator;

impl PlanGenerator for UnconfiguredPlanGenerator {
    fn generate(&self, _messages: Vec<ChatMessage>) -> BoxStream<'static, Result<String, HostError>> {
        let error = HostError::plan("no plan generator is configured");
        stream::iter([Err(error)]).boxed()
    }
}

/// Submission the editor should execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutePlanRequest {
    pub plan: String,
    #[serde(flatten)]
    pub submission: SubmitIdea,
}

impl ExecutePlanRequest {
    pub fn from_submission(submission: SubmitIdea) -> Self {
        Self {
            plan: submission.request.clone(),
            submission,
        }
    }
}

/// Side effects for the editor host.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatorEvent {
    ExecutePlan(ExecutePlanRequest),

    /// The folder was created; the editor should open it as the workspace.
    ReplaceWorkspaceFolder { path: PathBuf },

    StateChanged(CreatorModeState),
}

#[derive(Clone)]
pub struct CreatorHandler {
    state: HostState,
    planner: Arc<dyn PlanGenerator>,
    events: mpsc::UnboundedSender<CreatorEvent>,
    cache: SubmissionCache,
    cache_max_age: Duration,
}

impl CreatorHandler {
    pub fn new(
        state: HostState,
        planner: Arc<dyn PlanGenerator>,
        events: mpsc::UnboundedSender<CreatorEvent>,
        cache: SubmissionCache,
        cache_max_age: Duration,
    ) -> Self {
        Self {
            state,
            planner,
            events,
            cache,
            cache_max_age,
        }
    }

    pub async fn handle(&self, session: &HostSession, message: &OutgoingMessage) -> Result<(), HostError> {
        match message.message_type.as_str() {
            ProcessLlm::MESSAGE_TYPE => {
                let request: ProcessLlm = decode_payload(&message.message_type, message.payload.as_ref())?;
                self.process_llm(session, message, request).await
            }
            SubmitIdea::MESSAGE_TYPE => {
                let submission: SubmitIdea =
                    decode_payload(&message.message_type, message.payload.as_ref())?;
                self.submit_idea(submission).await
            }
            CloseOverlay::MESSAGE_TYPE => self.change_state(CreatorModeState::OverlayClosed).await,
            other => {
                warn!("Ignoring unknown creator message type: {other}");
                Ok(())
            }
        }
    }

    async fn process_llm(
        &self,
        session: &HostSession,
        message: &OutgoingMessage,
        request: ProcessLlm,
    ) -> Result<(), HostError> {
        debug!("Drafting plan from {} messages", request.messages.len());

        let mut chunks = self.planner.generate(request.messages);
        let mut plan = String::new();

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(chunk) => {
                    plan.push_str(&chunk);
                    session.reply(message, &PlanCreationStream { plan: plan.clone() })?;
                }
                Err(e) => {
                    error!("Plan creation failed: {e}");
                    let notice = ErrorNotice {
                        text: format!("Failed to create plan: {}", plan_error_text(&e)),
                    };
                    return session.reply(message, &notice);
                }
            }
        }

        info!("Plan completed ({} chars)", plan.len());
        session.reply(message, &PlanCreationCompleted { plan })
    }

    async fn submit_idea(&self, submission: SubmitIdea) -> Result<(), HostError> {
        self.change_state(CreatorModeState::OverlayClosedCreatorActive).await?;

        let Some(project_path) = submission.new_project_path().map(str::to_string) else {
            self.emit(CreatorEvent::ExecutePlan(ExecutePlanRequest::from_submission(submission)));
            return Ok(());
        };

        self.cache
            .store(&submission, self.state.creator_state().await)
            .await?;

        let folder = expand_home(&project_path);
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| HostError::io(format!("Failed to create folder {}: {e}", folder.display())))?;
        info!("Created project folder {}", folder.display());

        self.emit(CreatorEvent::ReplaceWorkspaceFolder { path: folder });
        Ok(())
    }

    /// Replay a submission cached before a workspace switch.
    ///
    /// Fires [`CreatorEvent::ExecutePlan`] and restores the cached creator
    /// state when the record is fresh. Returns whether anything was replayed.
    pub async fn replay_cached_submission(&self, clear: bool) -> Result<bool, HostError> {
        let Some(record) = self.cache.take_fresh(self.cache_max_age, clear).await? else {
            return Ok(false);
        };

        info!("Replaying cached creator submission");
        self.change_state(record.creator_state).await?;
        self.emit(CreatorEvent::ExecutePlan(ExecutePlanRequest::from_submission(
            record.submission,
        )));
        Ok(true)
    }

    async fn change_state(&self, next: CreatorModeState) -> Result<(), HostError> {
        self.state.update(StateCommand::SetCreatorState(next)).await?;
        self.emit(CreatorEvent::StateChanged(next));
        Ok(())
    }

    fn emit(&self, event: CreatorEvent) {
        if self.events.send(event).is_err() {
            debug!("No creator event receiver; event dropped");
        }
    }
}

/// The bare message of a plan failure, without the error's location suffix.
fn plan_error_text(error: &HostError) -> String {
    match error {
        HostError::Plan { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
