//! WebSocket relay broker and client using `tokio-tungstenite`.
//!
//! The relay is the smallest broker that satisfies [`Bus`]: peers send
//! [`BusFrame::Subscribe`] and [`BusFrame::Publish`], the relay answers with
//! [`BusFrame::Deliver`] for every publish matching a subscription.
//! Frames are JSON inside binary WebSocket messages.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Bus, BusMessage, Inbound, TransportError, topic_matches};

/// Counter for generating relay peer IDs.
static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

type ClientSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// A frame exchanged between the relay and its peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BusFrame {
    /// Peer → relay: start receiving messages matching `pattern`.
    Subscribe { pattern: String, no_local: bool },
    /// Peer → relay: broadcast `payload` on `topic`.
    Publish { topic: String, payload: Vec<u8> },
    /// Relay → peer: a publish that matched one of the peer's subscriptions.
    Deliver { topic: String, payload: Vec<u8> },
}

impl BusFrame {
    fn encode(&self) -> Result<Vec<u8>, TransportError> {
        serde_json::to_vec(self).map_err(|e| TransportError::MalformedFrame(e.to_string()))
    }

    fn decode(data: &[u8]) -> Result<Self, TransportError> {
        serde_json::from_slice(data).map_err(|e| TransportError::MalformedFrame(e.to_string()))
    }
}

fn io_error(kind: std::io::ErrorKind, e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(kind, e.to_string())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A [`Bus`] client that talks to a [`BusRelay`].
#[derive(Default)]
pub struct WebSocketBus {
    sink: Option<Arc<Mutex<ClientSink>>>,
    reader: Option<JoinHandle<()>>,
}

impl WebSocketBus {
    /// Creates a disconnected client.
    pub fn new() -> Self {
        Self::default()
    }

    async fn send_frame(&self, frame: &BusFrame) -> Result<(), TransportError> {
        let sink = self.sink.as_ref().ok_or(TransportError::NotConnected)?;
        let bytes = frame.encode()?;
        sink.lock()
            .await
            .send(Message::Binary(bytes.into()))
            .await
            .map_err(|e| TransportError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e)))
    }
}

impl Bus for WebSocketBus {
    async fn connect(&mut self, address: &str) -> Result<Inbound, TransportError> {
        let url = if address.starts_with("ws://") || address.starts_with("wss://") {
            address.to_string()
        } else {
            format!("ws://{address}")
        };

        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| {
                TransportError::ConnectFailed(io_error(std::io::ErrorKind::ConnectionRefused, e))
            })?;
        let (sink, mut stream) = ws.split();
        let (tx, rx) = mpsc::unbounded_channel();

        // The reader owns `tx`; when it exits the inbound channel closes.
        let reader = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let data = match msg {
                    Ok(Message::Binary(data)) => data.to_vec(),
                    Ok(Message::Text(text)) => text.as_bytes().to_vec(),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::debug!(error = %e, "relay connection failed");
                        break;
                    }
                };
                match BusFrame::decode(&data) {
                    Ok(BusFrame::Deliver { topic, payload }) => {
                        if tx.send(BusMessage { topic, payload }).is_err() {
                            break;
                        }
                    }
                    Ok(other) => {
                        tracing::debug!(frame = ?other, "unexpected frame from relay");
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "dropping undecodable relay frame");
                    }
                }
            }
            tracing::debug!("relay reader stopped");
        });

        self.sink = Some(Arc::new(Mutex::new(sink)));
        self.reader = Some(reader);
        tracing::info!(url = %url, "connected to bus relay");
        Ok(rx)
    }

    async fn subscribe(&self, pattern: &str, no_local: bool) -> Result<(), TransportError> {
        self.send_frame(&BusFrame::Subscribe {
            pattern: pattern.to_string(),
            no_local,
        })
        .await
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.send_frame(&BusFrame::Publish {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        })
        .await
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let closed = match self.sink.take() {
            Some(sink) => sink.lock().await.close().await.map_err(|e| {
                TransportError::SendFailed(io_error(std::io::ErrorKind::BrokenPipe, e))
            }),
            None => Ok(()),
        };
        if let Some(reader) = self.reader.take() {
            reader.abort();
            // Aborted is the expected outcome here.
            let _ = reader.await;
        }
        closed
    }
}

impl Drop for WebSocketBus {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

struct RelayPeer {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    subscriptions: Vec<(String, bool)>,
}

type PeerTable = Arc<Mutex<HashMap<u64, RelayPeer>>>;

/// A minimal pub/sub broker speaking [`BusFrame`] over WebSocket.
pub struct BusRelay {
    listener: TcpListener,
    peers: PeerTable,
}

impl BusRelay {
    /// Binds the relay to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "bus relay listening");
        Ok(Self {
            listener,
            peers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Returns the local address the relay is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts peers until the task is dropped or aborted.
    pub async fn run(self) -> Result<(), TransportError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let peers = Arc::clone(&self.peers);
                    tokio::spawn(async move {
                        if let Err(e) = serve_peer(stream, addr, peers).await {
                            tracing::debug!(%addr, error = %e, "relay peer ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "relay accept failed");
                }
            }
        }
    }
}

async fn serve_peer(
    stream: TcpStream,
    addr: SocketAddr,
    peers: PeerTable,
) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
        TransportError::AcceptFailed(io_error(std::io::ErrorKind::ConnectionRefused, e))
    })?;
    let id = NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed);
    let (mut sink, mut stream) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    peers.lock().await.insert(
        id,
        RelayPeer {
            outbound: tx,
            subscriptions: Vec::new(),
        },
    );
    tracing::debug!(peer = id, %addr, "relay peer connected");

    let writer = tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            if sink.send(Message::Binary(bytes.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        let data = match msg {
            Ok(Message::Binary(data)) => data.to_vec(),
            Ok(Message::Text(text)) => text.as_bytes().to_vec(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(peer = id, error = %e, "relay peer recv error");
                break;
            }
        };
        match BusFrame::decode(&data) {
            Ok(frame) => handle_frame(id, frame, &peers).await,
            Err(e) => tracing::debug!(peer = id, error = %e, "ignoring malformed frame"),
        }
    }

    peers.lock().await.remove(&id);
    writer.abort();
    tracing::debug!(peer = id, "relay peer disconnected");
    Ok(())
}

async fn handle_frame(from: u64, frame: BusFrame, peers: &PeerTable) {
    match frame {
        BusFrame::Subscribe { pattern, no_local } => {
            if let Some(peer) = peers.lock().await.get_mut(&from) {
                peer.subscriptions.push((pattern, no_local));
            }
        }
        BusFrame::Publish { topic, payload } => {
            let deliver = BusFrame::Deliver {
                topic: topic.clone(),
                payload,
            };
            let bytes = match deliver.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode deliver frame");
                    return;
                }
            };
            let peers = peers.lock().await;
            for (id, peer) in peers.iter() {
                let wants = peer.subscriptions.iter().any(|(pattern, no_local)| {
                    topic_matches(pattern, &topic) && !(*no_local && *id == from)
                });
                if wants {
                    let _ = peer.outbound.send(bytes.clone());
                }
            }
        }
        BusFrame::Deliver { .. } => {
            tracing::debug!(peer = from, "peer sent a deliver frame, ignoring");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_frame_json_shape() {
        let frame = BusFrame::Subscribe {
            pattern: "base/#".into(),
            no_local: true,
        };
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "Subscribe");
        assert_eq!(json["pattern"], "base/#");
        assert_eq!(json["no_local"], true);
    }

    #[test]
    fn test_bus_frame_decode_rejects_garbage() {
        assert!(matches!(
            BusFrame::decode(b"nope"),
            Err(TransportError::MalformedFrame(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_before_connect_is_not_connected() {
        let bus = WebSocketBus::new();
        assert!(matches!(
            bus.publish("a", b"x").await,
            Err(TransportError::NotConnected)
        ));
    }
}
