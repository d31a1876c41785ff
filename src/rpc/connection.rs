//! Backend connection manager
//!
//! Maintains a persistent WebSocket connection to one backend RPC service.
//! The connection is opened once at startup and reused for every request;
//! if the backend drops it, an internal loop reconnects with capped
//! exponential backoff. Requests queue while the link is down and fail at
//! the caller's timeout, never by gateway-side retry.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::types::{GatewayError, Result};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// A long-lived handle to one backend RPC endpoint
pub struct RpcConnection {
    url: String,
    /// Channel feeding the connection task
    tx: mpsc::Sender<(Vec<u8>, oneshot::Sender<Vec<u8>>)>,
    /// Whether the underlying WebSocket is currently up
    connected: Arc<RwLock<bool>>,
}

impl RpcConnection {
    /// Open a connection to the given endpoint.
    ///
    /// Returns immediately; the connection task connects (and reconnects)
    /// in the background. Requests sent before the link is up are queued
    /// and flushed once it is.
    pub fn open(url: &str) -> Self {
        let (tx, rx) = mpsc::channel::<(Vec<u8>, oneshot::Sender<Vec<u8>>)>(1000);
        let connected = Arc::new(RwLock::new(false));

        let conn = Self {
            url: url.to_string(),
            tx,
            connected: Arc::clone(&connected),
        };

        let url = url.to_string();
        tokio::spawn(async move {
            connection_loop(url, rx, connected).await;
        });

        conn
    }

    /// Send a request payload and wait for the matching response payload
    pub async fn request(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let (response_tx, response_rx) = oneshot::channel();

        self.tx
            .send((data, response_tx))
            .await
            .map_err(|_| GatewayError::Connection(format!("connection to {} closed", self.url)))?;

        response_rx
            .await
            .map_err(|_| GatewayError::Connection(format!("connection to {} dropped the request", self.url)))
    }

    /// Check if the WebSocket link is currently established
    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Endpoint this connection targets
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Main connection loop with reconnection logic
async fn connection_loop(
    url: String,
    mut rx: mpsc::Receiver<(Vec<u8>, oneshot::Sender<Vec<u8>>)>,
    connected: Arc<RwLock<bool>>,
) {
    let mut reconnect_delay = Duration::from_millis(100);
    let max_reconnect_delay = Duration::from_secs(30);

    loop {
        info!("Connecting to backend at {}", url);

        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                let (ws_sink, ws_stream) = ws.split();

                *connected.write().await = true;
                reconnect_delay = Duration::from_millis(100);
                info!("Connected to backend at {}", url);

                if let Err(e) = handle_messages(ws_sink, ws_stream, &mut rx).await {
                    error!("Backend connection error ({}): {}", url, e);
                }

                *connected.write().await = false;
            }
            Err(e) => {
                error!("Failed to connect to backend at {}: {}", url, e);
            }
        }

        warn!("Reconnecting to {} in {:?}...", url, reconnect_delay);
        tokio::time::sleep(reconnect_delay).await;
        reconnect_delay = (reconnect_delay * 2).min(max_reconnect_delay);
    }
}

/// Shuttle messages between the request channel and the backend WebSocket.
///
/// Responses are matched to requests in arrival order; both backends answer
/// one message per request on a single connection, so a FIFO queue suffices.
/// The envelope id carried in the payload lets the caller detect a
/// desynchronized stream.
async fn handle_messages(
    ws_sink: WsSink,
    mut ws_stream: WsStream,
    rx: &mut mpsc::Receiver<(Vec<u8>, oneshot::Sender<Vec<u8>>)>,
) -> Result<()> {
    let pending: Arc<Mutex<Vec<oneshot::Sender<Vec<u8>>>>> = Arc::new(Mutex::new(Vec::new()));
    let pending_for_send = Arc::clone(&pending);

    let ws_sink = Arc::new(Mutex::new(ws_sink));
    let ws_sink_for_rx = Arc::clone(&ws_sink);

    // Forward queued requests to the backend
    let request_handler = async {
        while let Some((data, response_tx)) = rx.recv().await {
            {
                let mut pending = pending_for_send.lock().await;
                pending.push(response_tx);
            }

            let mut sink = ws_sink_for_rx.lock().await;
            if let Err(e) = sink.send(Message::Binary(data)).await {
                error!("Failed to send to backend: {}", e);
                let mut pending = pending_for_send.lock().await;
                pending.pop();
                break;
            }
        }
    };

    // Dispatch backend responses to their waiting callers
    let response_handler = async {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Binary(data)) => {
                    let maybe_sender = {
                        let mut pending = pending.lock().await;
                        if pending.is_empty() {
                            None
                        } else {
                            Some(pending.remove(0))
                        }
                    };

                    if let Some(sender) = maybe_sender {
                        let _ = sender.send(data.to_vec());
                    } else {
                        warn!("Received response with no pending request");
                    }
                }
                Ok(Message::Ping(data)) => {
                    let mut sink = ws_sink.lock().await;
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Ok(Message::Close(frame)) => {
                    info!("Backend closed connection: {:?}", frame);
                    break;
                }
                Err(e) => {
                    error!("Backend WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = request_handler => {
            debug!("Request handler ended");
        }
        _ = response_handler => {
            debug!("Response handler ended");
        }
    }

    Ok(())
}
