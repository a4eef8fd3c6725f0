use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::counter;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::sequence::CorrelationId;

/// How long a reverse websocket call waits for its reply.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Table of calls waiting for a reply, keyed by correlation id.
///
/// The call path registers a slot and waits on it; the inbound message path
/// resolves it. Both sides may run on different tasks or threads. Every slot
/// is removed exactly once: by the resolution, or by its [`PendingCall`]
/// guard going away (timeout, error, or cancellation of the waiting task).
#[derive(Debug)]
pub struct CorrelationStore {
    slots: DashMap<CorrelationId, oneshot::Sender<Value>>,
    timeout: Duration,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_CALL_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Opens a slot for `id`. The returned guard owns the slot until it is
    /// resolved or dropped.
    pub fn register(self: &Arc<Self>, id: CorrelationId) -> ApiResult<PendingCall> {
        let (tx, rx) = oneshot::channel();
        match self.slots.entry(id) {
            Entry::Occupied(_) => {
                return Err(ApiError::Internal(format!(
                    "correlation id {id} is already pending"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }
        Ok(PendingCall {
            id,
            deadline: Instant::now() + self.timeout,
            rx,
            store: Arc::clone(self),
        })
    }

    /// Fulfils the slot for `id` with `reply`.
    ///
    /// Unknown ids are expected (late or duplicate replies) and are ignored.
    /// Returns whether a waiting call received the reply.
    pub fn resolve(&self, id: CorrelationId, reply: Value) -> bool {
        let Some((_, tx)) = self.slots.remove(&id) else {
            debug!(seq = id, "dropping reply with no pending call");
            counter!("botapi_late_replies_total").increment(1);
            return false;
        };
        if tx.send(reply).is_err() {
            debug!(seq = id, "waiter went away before its reply was delivered");
            return false;
        }
        true
    }

    /// Routes an inbound frame to its pending call using `echo.seq`.
    ///
    /// Connection management calls this for every decoded frame; frames
    /// without an integer `echo.seq` are not replies and are ignored.
    pub fn resolve_frame(&self, frame: Value) -> bool {
        let Some(seq) = frame
            .get("echo")
            .and_then(|echo| echo.get("seq"))
            .and_then(Value::as_u64)
        else {
            return false;
        };
        self.resolve(seq, frame)
    }

    pub fn contains(&self, id: CorrelationId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of calls currently waiting for a reply.
    pub fn pending(&self) -> usize {
        self.slots.len()
    }
}

impl Default for CorrelationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for one outstanding call. Dropping it releases the slot.
#[derive(Debug)]
pub struct PendingCall {
    id: CorrelationId,
    deadline: Instant,
    rx: oneshot::Receiver<Value>,
    store: Arc<CorrelationStore>,
}

impl PendingCall {
    pub fn id(&self) -> CorrelationId {
        self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Waits for the reply frame until the deadline.
    pub async fn wait(mut self) -> ApiResult<Value> {
        match tokio::time::timeout_at(self.deadline, &mut self.rx).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(ApiError::network(
                "reply slot closed before a reply arrived",
            )),
            Err(_) => {
                warn!(seq = self.id, "no reply before the call deadline");
                Err(ApiError::timeout())
            }
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.store.slots.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn wait_returns_the_resolved_reply() {
        let store = Arc::new(CorrelationStore::new());
        let pending = store.register(7).unwrap();
        assert!(store.contains(7));

        let resolver = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                store.resolve(7, json!({"status": "ok", "data": 1}))
            })
        };

        let reply = pending.wait().await.unwrap();
        assert_eq!(reply["data"], 1);
        assert!(resolver.await.unwrap());
        assert!(!store.contains(7));
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn reply_before_wait_is_kept() {
        let store = Arc::new(CorrelationStore::new());
        let pending = store.register(1).unwrap();
        assert!(store.resolve(1, json!("early")));
        assert!(!store.contains(1));
        assert_eq!(pending.wait().await.unwrap(), json!("early"));
    }

    #[test]
    fn resolving_unknown_ids_is_a_no_op() {
        let store = CorrelationStore::new();
        assert!(!store.resolve(99, json!({})));
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let store = Arc::new(CorrelationStore::new());
        let _first = store.register(3).unwrap();
        let err = store.register(3).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert_eq!(store.pending(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_sixty_seconds_and_releases_the_slot() {
        let store = Arc::new(CorrelationStore::new());
        let started = Instant::now();
        let pending = store.register(5).unwrap();

        let err = pending.wait().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(!store.contains(5));
    }

    #[tokio::test(start_paused = true)]
    async fn honours_a_custom_timeout() {
        let store = Arc::new(CorrelationStore::with_timeout(Duration::from_secs(2)));
        let started = Instant::now();
        let err = store.register(1).unwrap().wait().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn cancelled_waiters_release_their_slot() {
        let store = Arc::new(CorrelationStore::new());
        let pending = store.register(11).unwrap();
        let task = tokio::spawn(pending.wait());
        tokio::task::yield_now().await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!store.contains(11));
        assert!(!store.resolve(11, json!({})));
    }

    #[tokio::test]
    async fn routes_frames_by_echo_seq() {
        let store = Arc::new(CorrelationStore::new());
        let pending = store.register(42).unwrap();

        assert!(!store.resolve_frame(json!({"post_type": "message"})));
        assert!(!store.resolve_frame(json!({"echo": {"seq": "42"}})));
        assert!(!store.resolve_frame(json!({"echo": 42})));
        assert!(store.contains(42));

        let frame = json!({"status": "ok", "data": null, "echo": {"seq": 42}});
        assert!(store.resolve_frame(frame.clone()));
        assert_eq!(pending.wait().await.unwrap(), frame);
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn late_replies_are_dropped_quietly() {
        let store = Arc::new(CorrelationStore::with_timeout(Duration::from_secs(1)));
        let err = store.register(8).unwrap().wait().await.unwrap_err();
        assert!(err.is_timeout());

        assert!(!store.resolve_frame(json!({"status": "ok", "echo": {"seq": 8}})));
        assert!(logs_contain("dropping reply with no pending call"));
    }
}
