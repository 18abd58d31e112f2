//! Bridge host WebSocket server.
//!
//! # Security
//!
//! - Binds to `127.0.0.1` only
//! - Rejects non-loopback peers before the upgrade
//! - Requires the auth token in the upgrade request (`?token=`), HTTP 401
//!   otherwise
//!
//! # Protocol
//!
//! Text frames carrying camelCase JSON envelopes. Webviews send
//! [`OutgoingMessage`]s; the host answers with [`IncomingMessage`]s that reuse
//! the request's `messageId`, and pushes uncorrelated messages (`ping`, `tab`,
//! `themeColors`) on its own.

use crate::BRIDGE_HOSTNAME;
use crate::config::BridgeConfig;
use crate::error::HostError;
use crate::host::handle::{BridgeHostHandle, SessionMap};
use crate::host::handshake::HandshakeState;
use crate::host::router::HostRouter;
use crate::host::session::HostSession;
use crate::protocol::catalog::ErrorNotice;
use crate::protocol::{OutgoingMessage, PONG_MESSAGE_TYPE};

use common::ErrorLocation;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use uuid::Uuid;

/// Starts the bridge host on `config.host.port` (0 picks a free port).
///
/// # Errors
///
/// Returns [`HostError::Io`] if the port cannot be bound.
pub async fn start_bridge_host(config: &BridgeConfig, router: HostRouter) -> Result<BridgeHostHandle, HostError> {
    let auth_token = config.host.auth_token.clone().unwrap_or_else(|| {
        let token = Uuid::new_v4().to_string();
        info!("Generated bridge auth token");
        token
    });

    let address = format!("{BRIDGE_HOSTNAME}:{}", config.host.port);
    let listener = TcpListener::bind(&address).await?;
    let local_addr = listener.local_addr()?;

    info!("Bridge host listening on {local_addr}");

    let sessions: SessionMap = Arc::new(RwLock::new(HashMap::new()));
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let context = ConnectionContext {
        auth_token: auth_token.clone(),
        router,
        sessions: Arc::clone(&sessions),
        heartbeat: config.host.heartbeat_interval(),
    };

    let accept_task = tokio::spawn(accept_loop(listener, context, shutdown_rx));

    Ok(BridgeHostHandle {
        local_addr,
        auth_token,
        sessions,
        shutdown_tx: Some(shutdown_tx),
        accept_task: Some(accept_task),
    })
}

#[derive(Clone)]
struct ConnectionContext {
    auth_token: String,
    router: HostRouter,
    sessions: SessionMap,
    heartbeat: Option<Duration>,
}

async fn accept_loop(listener: TcpListener, context: ConnectionContext, mut shutdown_rx: oneshot::Receiver<()>) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("Bridge host shutdown requested");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    debug!("Webview connecting from {addr}");
                    let context = context.clone();
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, context).await {
                            error!("Connection from {addr} failed: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept bridge connection: {e}");
                }
            },
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    warn!("Connection task ended abnormally: {e}");
                }
            }
        }
    }

    connections.shutdown().await;
}

/// Aborts the wrapped task when dropped.
struct TaskGuard(JoinHandle<()>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Serve one webview connection until it closes.
///
/// Frames are handled one at a time in arrival order.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, context: ConnectionContext) -> Result<(), HostError> {
    if !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {addr}");
        return Ok(());
    }

    let mut handshake = HandshakeState::new(context.auth_token.clone());
    let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        handshake.check_request(request, response)
    };

    let upgraded = accept_hdr_async(stream, callback).await;
    let ws_stream = match upgraded {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            if handshake.is_authenticated() {
                return Err(HostError::Handshake {
                    message: format!("WebSocket handshake failed: {e}"),
                    location: ErrorLocation::caller(),
                });
            }
            debug!("Unauthenticated upgrade from {addr} closed: {e}");
            return Ok(());
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let session = HostSession::new(outbound_tx);
    let session_id = session.id();

    info!("Webview {addr} connected as session {session_id}");
    context.sessions.write().await.insert(session_id, session.clone());

    let _writer = TaskGuard(tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            trace!("Host → webview {session_id}: {frame}");
            if let Err(e) = write.send(Message::Text(frame.into())).await {
                error!("Failed to send to session {session_id}: {e}");
                break;
            }
        }
        let _ = write.close().await;
    }));

    let _heartbeat = context
        .heartbeat
        .map(|period| TaskGuard(tokio::spawn(heartbeat(session.clone(), period))));

    let result = read_loop(&mut read, &session, &context.router).await;

    context.sessions.write().await.remove(&session_id);
    info!("Session {session_id} ({addr}) disconnected");
    result
}

async fn read_loop<S>(read: &mut S, session: &HostSession, router: &HostRouter) -> Result<(), HostError>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_frame(text.as_str(), session, router).await,
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                warn!("Session {} sent a binary frame; ignoring", session.id());
            }
            Ok(_) => {}
            Err(e) => {
                return Err(HostError::Read {
                    message: format!("Error reading from session {}: {e}", session.id()),
                    location: ErrorLocation::caller(),
                });
            }
        }
    }

    Ok(())
}

async fn handle_frame(frame: &str, session: &HostSession, router: &HostRouter) {
    trace!("Webview {} → host: {frame}", session.id());

    let message: OutgoingMessage = match serde_json::from_str(frame) {
        Ok(message) => message,
        Err(e) => {
            warn!("Undecodable frame from session {}: {e}", session.id());
            let notice = ErrorNotice {
                text: format!("Invalid message: {e}"),
            };
            if let Err(e) = session.push(&notice) {
                error!("Failed to report decode error: {e}");
            }
            return;
        }
    };

    if message.message_type == PONG_MESSAGE_TYPE {
        session.record_pong();
        return;
    }

    if let Err(e) = router.route(session, &message).await {
        error!("Error handling {} from session {}: {e}", message.message_type, session.id());
        let notice = ErrorNotice {
            text: format!("Failed to handle {}: {e}", message.message_type),
        };
        if let Err(e) = session.reply(&message, &notice) {
            error!("Failed to report handler error: {e}");
        }
    }
}

async fn heartbeat(session: HostSession, period: Duration) {
    let Some(first_tick) = Instant::now().checked_add(period) else {
        warn!("Heartbeat period {period:?} is out of range; session {} is not pinged", session.id());
        return;
    };
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = session.ping() {
            debug!("Heartbeat stopped for session {}: {e}", session.id());
            break;
        }
    }
}
