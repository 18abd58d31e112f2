//! Handle to a running bridge host.

use crate::error::HostError;
use crate::host::session::HostSession;
use crate::protocol::catalog::{SettingsTab, ThemeColors};
use crate::protocol::{IncomingMessage, MessageKind};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{RwLock, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub(crate) type SessionMap = Arc<RwLock<HashMap<Uuid, HostSession>>>;

/// Handle to a running bridge host.
///
/// Returned by [`start_bridge_host`](crate::host::start_bridge_host). The host
/// keeps accepting connections until [`shutdown`](Self::shutdown) is called
/// or the handle is dropped.
pub struct BridgeHostHandle {
    pub(crate) local_addr: SocketAddr,
    pub(crate) auth_token: String,
    pub(crate) sessions: SessionMap,
    pub(crate) shutdown_tx: Option<oneshot::Sender<()>>,
    pub(crate) accept_task: Option<JoinHandle<()>>,
}

impl BridgeHostHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Token webviews must present on connect.
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Pongs received across all live sessions.
    pub async fn pongs_received(&self) -> u64 {
        self.sessions
            .read()
            .await
            .values()
            .map(HostSession::pongs_received)
            .sum()
    }

    /// Ping every session. Returns how many pings were queued.
    pub async fn ping_all(&self) -> usize {
        self.for_each_session(|session| session.ping()).await
    }

    /// Send an untyped host-initiated message to every session.
    pub async fn broadcast(&self, message_type: &str, data: serde_json::Value) -> usize {
        let message = IncomingMessage::broadcast(message_type, data);
        self.for_each_session(|session| session.send(&message)).await
    }

    /// Send a typed host-initiated message to every session.
    pub async fn push<M>(&self, payload: &M) -> usize
    where
        M: MessageKind + Serialize,
    {
        self.for_each_session(|session| session.push(payload)).await
    }

    /// Switch the settings screen to `tab`.
    pub async fn open_settings_tab(&self, tab: &str) -> usize {
        info!("Opening settings tab {tab}");
        self.push(&SettingsTab {
            tab: tab.to_string(),
        })
        .await
    }

    pub async fn send_theme_colors(&self, colors: ThemeColors) -> usize {
        debug!("Pushing {} theme colours", colors.0.len());
        self.push(&colors).await
    }

    async fn for_each_session<F>(&self, send: F) -> usize
    where
        F: Fn(&HostSession) -> Result<(), HostError>,
    {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|session| match send(session) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to reach session {}: {e}", session.id());
                    false
                }
            })
            .count()
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Live sessions are closed by dropping their outbound queues.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                warn!("Bridge accept loop ended abnormally: {e}");
            }
        }
        self.sessions.write().await.clear();
        info!("Bridge host on {} stopped", self.local_addr);
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for BridgeHostHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
