//! Host state management using actor pattern.
//!
//! Tracks:
//! - Creator overlay mode
//! - Account credentials served to the settings screen
//!
//! # Architecture
//!
//! - Commands are sent via an mpsc channel and acknowledged once applied
//! - A dedicated task processes commands sequentially
//! - Reads use `Arc<RwLock<T>>` and never wait on the actor

use crate::error::HostError;
use crate::host::creator::CreatorModeState;
use crate::host::settings::Credentials;

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};

/// Commands that mutate host state.
#[derive(Debug, Clone)]
pub enum StateCommand {
    SetCreatorState(CreatorModeState),

    /// Replace the stored credentials
    SetCredentials(Credentials),

    ClearCredentials,
}

type Envelope = (StateCommand, oneshot::Sender<()>);

/// Host state manager.
///
/// This type is `Clone`; all clones share the same underlying state.
#[derive(Clone)]
pub struct HostState {
    /// Channel to send state mutation commands to the actor
    command_tx: Arc<Mutex<Option<mpsc::Sender<Envelope>>>>,

    creator_state: Arc<RwLock<CreatorModeState>>,

    credentials: Arc<RwLock<Credentials>>,
}

impl HostState {
    /// Create a new host state manager.
    ///
    /// The actor will be lazily spawned on first use within an async context.
    pub fn new() -> Self {
        Self::with_credentials(Credentials::default())
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            command_tx: Arc::new(Mutex::new(None)),
            creator_state: Arc::new(RwLock::new(CreatorModeState::default())),
            credentials: Arc::new(RwLock::new(credentials)),
        }
    }

    /// Apply a state command and wait until the actor has applied it.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::State`] if the state actor has stopped.
    pub async fn update(&self, cmd: StateCommand) -> Result<(), HostError> {
        let tx = self.ensure_actor().await;
        let (ack_tx, ack_rx) = oneshot::channel();

        tx.send((cmd, ack_tx))
            .await
            .map_err(|e| HostError::state(format!("State actor died: {e}")))?;

        ack_rx
            .await
            .map_err(|_| HostError::state("State actor dropped the command"))
    }

    pub async fn creator_state(&self) -> CreatorModeState {
        *self.creator_state.read().await
    }

    pub async fn credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    async fn ensure_actor(&self) -> mpsc::Sender<Envelope> {
        let mut tx_guard = self.command_tx.lock().await;

        if let Some(tx) = tx_guard.as_ref() {
            return tx.clone();
        }

        let (tx, rx) = mpsc::channel(100);
        *tx_guard = Some(tx.clone());
        drop(tx_guard);

        tokio::spawn(state_actor(
            rx,
            Arc::clone(&self.creator_state),
            Arc::clone(&self.credentials),
        ));
        info!("Host state actor spawned");

        tx
    }
}

impl Default for HostState {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the mutable state and processes commands sequentially until every
/// `HostState` handle is dropped.
async fn state_actor(
    mut command_rx: mpsc::Receiver<Envelope>,
    creator_state: Arc<RwLock<CreatorModeState>>,
    credentials: Arc<RwLock<Credentials>>,
) {
    debug!("Host state actor started");

    while let Some((cmd, ack)) = command_rx.recv().await {
        match cmd {
            StateCommand::SetCreatorState(next) => {
                let mut state_write = creator_state.write().await;
                if *state_write != next {
                    info!("Creator state: {:?} -> {:?}", *state_write, next);
                }
                *state_write = next;
            }
            StateCommand::SetCredentials(next) => {
                let mut credentials_write = credentials.write().await;
                info!(
                    "Credentials updated (access token: {}, refresh token: {})",
                    next.has_access_token(),
                    next.has_refresh_token()
                );
                *credentials_write = next;
            }
            StateCommand::ClearCredentials => {
                let mut credentials_write = credentials.write().await;
                if credentials_write.is_empty() {
                    warn!("Clear credentials requested but none were stored");
                }
                *credentials_write = Credentials::default();
            }
        }

        // The caller may have given up waiting; the command is applied either way.
        let _ = ack.send(());
    }

    debug!("Host state actor stopped");
}
