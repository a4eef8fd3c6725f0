use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::error::{ApiError, ApiResult};

/// Send half of a live connection opened by a bot peer.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn send_text(&self, frame: String) -> ApiResult<()>;
}

/// Connection handle that queues frames for a websocket writer task.
#[derive(Clone, Debug)]
pub struct ChannelConnection {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelConnection {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Handle plus the receiver the writer task drains.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl PeerConnection for ChannelConnection {
    async fn send_text(&self, frame: String) -> ApiResult<()> {
        self.tx
            .send(frame)
            .map_err(|_| ApiError::network("peer connection is closed"))
    }
}

/// Live reverse connections keyed by the peer's self id.
///
/// Connection management owns the entries; the api only reads them.
#[derive(Default)]
pub struct PeerRegistry {
    inner: DashMap<String, Arc<dyn PeerConnection>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, self_id: impl Into<String>, conn: Arc<dyn PeerConnection>) {
        self.inner.insert(self_id.into(), conn);
    }

    pub fn remove(&self, self_id: &str) -> Option<Arc<dyn PeerConnection>> {
        self.inner.remove(self_id).map(|(_, conn)| conn)
    }

    pub fn get(&self, self_id: &str) -> Option<Arc<dyn PeerConnection>> {
        self.inner.get(self_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, self_id: &str) -> bool {
        self.inner.contains_key(self_id)
    }

    /// The only registered connection and its self id, if exactly one exists.
    pub fn sole(&self) -> Option<(String, Arc<dyn PeerConnection>)> {
        let mut entries = self.inner.iter();
        let first = entries.next()?;
        if entries.next().is_some() {
            return None;
        }
        Some((first.key().clone(), Arc::clone(first.value())))
    }

    pub fn self_ids(&self) -> Vec<String> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

tokio::task_local! {
    static CURRENT_PEER: String;
}

/// Runs `fut` as the handler of an inbound event from `self_id`.
///
/// Calls made inside prefer the connection of that peer.
pub async fn with_peer<F>(self_id: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_PEER.scope(self_id.into(), fut).await
}

/// Self id of the peer whose event is being handled, if any.
pub fn current_peer() -> Option<String> {
    CURRENT_PEER.try_with(Clone::clone).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sole_requires_exactly_one_connection() {
        let peers = PeerRegistry::new();
        assert!(peers.sole().is_none());

        let (a, _rx_a) = ChannelConnection::pair();
        peers.insert("10001", Arc::new(a));
        assert!(peers.sole().is_some());

        let (b, _rx_b) = ChannelConnection::pair();
        peers.insert("10002", Arc::new(b));
        assert!(peers.sole().is_none());

        peers.remove("10001");
        assert!(peers.sole().is_some());
        assert_eq!(peers.self_ids(), vec!["10002".to_string()]);
    }

    #[tokio::test]
    async fn channel_connection_queues_frames() {
        let (conn, mut rx) = ChannelConnection::pair();
        conn.send_text("hello".into()).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));

        drop(rx);
        let err = conn.send_text("again".into()).await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
    }

    #[tokio::test]
    async fn current_peer_is_scoped() {
        assert_eq!(current_peer(), None);
        let seen = with_peer("10001", async { current_peer() }).await;
        assert_eq!(seen.as_deref(), Some("10001"));
        assert_eq!(current_peer(), None);
    }
}
