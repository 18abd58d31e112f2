use crate::config::BridgeConfig;
use crate::error::HostError;
use crate::host::creator::{CreatorEvent, CreatorHandler, PlanGenerator, SubmissionCache};
use crate::host::session::HostSession;
use crate::host::settings::SettingsHandler;
use crate::host::state::HostState;
use crate::protocol::{Destination, OutgoingMessage};

use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;

/// Dispatches decoded webview messages to the handler for their destination.
#[derive(Clone)]
pub struct HostRouter {
    state: HostState,
    creator: CreatorHandler,
    settings: SettingsHandler,
}

impl HostRouter {
    pub fn new(
        config: &BridgeConfig,
        state: HostState,
        planner: Arc<dyn PlanGenerator>,
        events: mpsc::UnboundedSender<CreatorEvent>,
        cache: SubmissionCache,
    ) -> Self {
        Self {
            creator: CreatorHandler::new(
                state.clone(),
                planner,
                events,
                cache,
                config.creator.cache_max_age(),
            ),
            settings: SettingsHandler::new(state.clone()),
            state,
        }
    }

    pub async fn route(&self, session: &HostSession, message: &OutgoingMessage) -> Result<(), HostError> {
        debug!(
            "Routing {} ({}) to {}",
            message.message_type, message.message_id, message.destination
        );

        match message.destination {
            Destination::Creator => self.creator.handle(session, message).await,
            Destination::Settings => self.settings.handle(session, message).await,
        }
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn creator(&self) -> &CreatorHandler {
        &self.creator
    }
}
