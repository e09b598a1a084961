//! In-process broker, used by tests and local simulations.
//!
//! Every [`MemoryBus`] created from the same [`MemoryBroker`] shares one
//! subscription table. Publishing walks the table and pushes a copy of the
//! message into every matching client's inbound channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{Bus, BusMessage, Inbound, TransportError, topic_matches};

#[derive(Debug)]
struct Subscription {
    pattern: String,
    no_local: bool,
}

#[derive(Debug)]
struct Client {
    sender: mpsc::UnboundedSender<BusMessage>,
    subscriptions: Vec<Subscription>,
}

#[derive(Debug, Default)]
struct BrokerInner {
    clients: Mutex<HashMap<u64, Client>>,
    next_client: AtomicU64,
    /// When set, `no_local` subscriptions still receive their own publishes.
    ignore_no_local: AtomicBool,
}

/// A shared in-memory broker. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    /// Creates an empty broker that honors `no_local`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the broker echo publishes back to their sender even when the
    /// sender subscribed with `no_local`, like brokers that predate it.
    pub fn set_ignore_no_local(&self, ignore: bool) {
        self.inner.ignore_no_local.store(ignore, Ordering::Relaxed);
    }

    /// Creates a new, not-yet-connected client of this broker.
    pub fn client(&self) -> MemoryBus {
        MemoryBus {
            broker: self.clone(),
            id: None,
        }
    }

    /// Number of currently connected clients.
    pub async fn client_count(&self) -> usize {
        self.inner.clients.lock().await.len()
    }

    async fn route(&self, from: u64, topic: &str, payload: &[u8]) {
        let ignore_no_local = self.inner.ignore_no_local.load(Ordering::Relaxed);
        let clients = self.inner.clients.lock().await;
        let mut delivered = 0usize;

        for (id, client) in clients.iter() {
            let wants = client.subscriptions.iter().any(|sub| {
                topic_matches(&sub.pattern, topic)
                    && !(sub.no_local && *id == from && !ignore_no_local)
            });
            if wants {
                // A dropped receiver just means that client stopped listening.
                if client.sender.send(BusMessage::new(topic, payload)).is_ok() {
                    delivered += 1;
                }
            }
        }

        tracing::trace!(topic, delivered, "memory broker routed message");
    }
}

/// A client connection to a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemoryBus {
    broker: MemoryBroker,
    id: Option<u64>,
}

impl MemoryBus {
    fn id(&self) -> Result<u64, TransportError> {
        self.id.ok_or(TransportError::NotConnected)
    }
}

impl Bus for MemoryBus {
    async fn connect(&mut self, address: &str) -> Result<Inbound, TransportError> {
        let id = self.broker.inner.next_client.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.broker.inner.clients.lock().await.insert(
            id,
            Client {
                sender: tx,
                subscriptions: Vec::new(),
            },
        );
        self.id = Some(id);
        tracing::debug!(client = id, address, "memory bus connected");
        Ok(rx)
    }

    async fn subscribe(&self, pattern: &str, no_local: bool) -> Result<(), TransportError> {
        let id = self.id()?;
        let mut clients = self.broker.inner.clients.lock().await;
        let client = clients.get_mut(&id).ok_or(TransportError::NotConnected)?;
        client.subscriptions.push(Subscription {
            pattern: pattern.to_string(),
            no_local,
        });
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let id = self.id()?;
        self.broker.route(id, topic, payload).await;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(id) = self.id.take() {
            // Dropping the sender closes the client's inbound channel.
            self.broker.inner.clients.lock().await.remove(&id);
            tracing::debug!(client = id, "memory bus disconnected");
        }
        Ok(())
    }
}
