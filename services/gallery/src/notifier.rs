//! Server-sent notification fan-out.
//!
//! The [`Notifier`] owns one unbounded sink per connected client. There is no
//! replay: a client only sees notifications broadcast while it is
//! registered. A failed send is logged and the client stays registered until
//! its stream is dropped.

use chrono::{DateTime, Utc};
use futures::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

/// Opaque handle for a registered client
pub type ClientId = u64;

/// Frame pushed to every connected client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

struct ClientSink {
    sender: UnboundedSender<Notification>,
    connected_at: DateTime<Utc>,
}

/// Registry of connected notification clients
#[derive(Default)]
pub struct Notifier {
    clients: Mutex<BTreeMap<ClientId, ClientSink>>,
    next_id: AtomicU64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client and hand back the receiving end of its sink
    pub fn register(&self) -> (ClientId, UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connected_at = Utc::now();

        self.clients.lock().insert(
            id,
            ClientSink {
                sender,
                connected_at,
            },
        );

        info!(
            client_id = id,
            connected_at = connected_at.timestamp_millis(),
            "Client connected to notifications"
        );
        (id, receiver)
    }

    /// Remove a client; returns false if it was already gone
    pub fn unregister(&self, id: ClientId) -> bool {
        match self.clients.lock().remove(&id) {
            Some(sink) => {
                info!(
                    client_id = id,
                    connected_at = sink.connected_at.timestamp_millis(),
                    "Client disconnected from notifications"
                );
                true
            }
            None => false,
        }
    }

    /// Send a notification to every registered client.
    ///
    /// Returns how many clients accepted it.
    pub fn broadcast(&self, notification: &Notification) -> usize {
        info!(message = %notification.message, "Broadcasting notification");

        let clients = self.clients.lock();
        let mut delivered = 0;

        for (id, sink) in clients.iter() {
            match sink.sender.send(notification.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(client_id = *id, error = %e, "Failed to send notification"),
            }
        }

        metrics::counter!("gallery_notifications_sent_total").increment(delivered as u64);
        delivered
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Register a client whose registration ends when the stream is dropped
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (id, receiver) = self.register();
        Subscription {
            id,
            receiver,
            notifier: Arc::clone(self),
        }
    }
}

/// Notification stream of one client
pub struct Subscription {
    id: ClientId,
    receiver: UnboundedReceiver<Notification>,
    notifier: Arc<Notifier>,
}

impl Subscription {
    pub fn id(&self) -> ClientId {
        self.id
    }
}

impl Stream for Subscription {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.notifier.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_broadcast_without_clients() {
        let notifier = Notifier::new();
        assert_eq!(notifier.broadcast(&Notification::new("nobody")), 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_client() {
        let notifier = Notifier::new();
        let (_, mut first) = notifier.register();
        let (_, mut second) = notifier.register();

        assert_eq!(notifier.broadcast(&Notification::new("catalog rebuilt")), 2);
        assert_eq!(first.recv().await.unwrap().message, "catalog rebuilt");
        assert_eq!(second.recv().await.unwrap().message, "catalog rebuilt");
    }

    #[tokio::test]
    async fn test_no_replay_for_late_clients() {
        let notifier = Notifier::new();
        notifier.broadcast(&Notification::new("early"));

        let (_, mut late) = notifier.register();
        notifier.broadcast(&Notification::new("late"));
        assert_eq!(late.recv().await.unwrap().message, "late");
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let notifier = Notifier::new();
        let (id, _receiver) = notifier.register();

        assert!(notifier.unregister(id));
        assert!(!notifier.unregister(id));
        assert_eq!(notifier.client_count(), 0);
    }

    #[test]
    fn test_broken_client_stays_registered() {
        let notifier = Notifier::new();
        let (_, receiver) = notifier.register();
        let (_, _healthy) = notifier.register();
        drop(receiver);

        assert_eq!(notifier.broadcast(&Notification::new("one")), 1);
        assert_eq!(notifier.client_count(), 2);
        assert_eq!(notifier.broadcast(&Notification::new("two")), 1);
    }

    #[tokio::test]
    async fn test_subscription_unregisters_on_drop() {
        let notifier = Arc::new(Notifier::new());
        let mut subscription = notifier.subscribe();
        let id = subscription.id();
        assert_eq!(notifier.client_count(), 1);

        notifier.broadcast(&Notification::new("hello"));
        assert_eq!(subscription.next().await, Some(Notification::new("hello")));

        drop(subscription);
        assert_eq!(notifier.client_count(), 0);
        assert!(!notifier.unregister(id));
    }
}
