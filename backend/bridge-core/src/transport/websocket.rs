//! WebSocket client side of the bridge: a webview talking to the bridge host.
//!
//! [`connect_webview`] dials `ws://127.0.0.1:<port>/?token=<token>`, then runs
//! two background tasks:
//!
//! - **writer** - drains the outbound queue the [`WebSocketTransport`] posts to
//!   and sends each message as a JSON text frame
//! - **reader** - feeds every inbound text frame to
//!   [`Messenger::handle_raw`](crate::messenger::Messenger::handle_raw)

use crate::config::MessagingConfig;
use crate::error::TransportError;
use crate::messenger::Messenger;
use crate::protocol::{Destination, OutgoingMessage};
use crate::transport::HostTransport;
use crate::{BRIDGE_BASE_URL, TOKEN_QUERY_PARAM};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, trace, warn};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep as TokioSleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport that queues JSON frames for the connection's writer task.
///
/// Unavailable once the socket is closed in either direction.
#[derive(Clone)]
pub struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

impl HostTransport for WebSocketTransport {
    fn post(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::unavailable("bridge connection closed"));
        }
        let frame = serde_json::to_string(message)?;
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::unavailable("bridge connection closed"))
    }
}

/// A live webview connection to the bridge host.
///
/// Dropping it stops the reader and writer tasks; messengers cloned from it
/// then see an unavailable transport.
pub struct WebviewConnection {
    messenger: Messenger,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WebviewConnection {
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// True until the socket is closed.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

impl Drop for WebviewConnection {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.reader.abort();
        self.writer.abort();
    }
}

/// Build the bridge URL for `port`, carrying `token` as a query parameter.
pub fn bridge_url(port: u16, token: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(&format!("{BRIDGE_BASE_URL}:{port}/"))
        .map_err(|e| TransportError::connect(format!("Invalid bridge URL: {e}")))?;
    url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, token);
    Ok(url)
}

/// Connect a webview for `destination` to the bridge host on `port`.
///
/// Retries with exponential backoff until `config.connect_timeout_ms` elapses.
///
/// # Errors
///
/// Returns [`TransportError::Connect`] if no connection could be established
/// (host not listening, or the token was rejected).
pub async fn connect_webview(
    port: u16,
    token: &str,
    destination: Destination,
    config: &MessagingConfig,
) -> Result<WebviewConnection, TransportError> {
    let url = bridge_url(port, token)?;
    let stream = connect_with_retry(&url, config).await?;
    info!("Webview ({destination}) connected to bridge on port {port}");

    let (mut write, mut read) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    let closed = Arc::new(AtomicBool::new(false));
    let transport = Arc::new(WebSocketTransport {
        outbound: outbound_tx,
        closed: Arc::clone(&closed),
    });
    let messenger = Messenger::new(destination, transport, config);

    let writer_closed = Arc::clone(&closed);
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            trace!("Webview → host: {frame}");
            if let Err(e) = write.send(Message::Text(frame.into())).await {
                error!("Failed to send frame to bridge host: {e}");
                break;
            }
        }
        writer_closed.store(true, Ordering::Release);
        debug!("Webview writer stopped");
    });

    let reader_messenger = messenger.clone();
    let reader_closed = Arc::clone(&closed);
    let reader = tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    trace!("Host → webview: {}", text.as_str());
                    if let Err(e) = reader_messenger.handle_raw(text.as_str()) {
                        warn!("Ignoring undecodable frame from host: {e}");
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("Bridge host closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Error reading from bridge host: {e}");
                    break;
                }
            }
        }
        // Posts from here on fail fast instead of queueing into a dead socket
        reader_closed.store(true, Ordering::Release);
        debug!("Webview reader stopped");
    });

    Ok(WebviewConnection {
        messenger,
        closed,
        reader,
        writer,
    })
}

async fn connect_with_retry(url: &Url, config: &MessagingConfig) -> Result<ClientStream, TransportError> {
    let mut backoff = ExponentialBackoff {
        max_elapsed_time: Some(config.connect_timeout()),
        ..Default::default()
    };

    loop {
        let error = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => return Ok(stream),
            Err(e) => e,
        };

        match backoff.next_backoff() {
            Some(duration) => {
                debug!("Bridge not reachable ({error}), retrying after {duration:?}");
                TokioSleep(duration).await;
            }
            None => {
                return Err(TransportError::connect(format!(
                    "Could not connect to bridge within {:?}: {error}",
                    config.connect_timeout()
                )));
            }
        }
    }
}
