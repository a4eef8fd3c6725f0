use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::api::Api;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::peer::{PeerConnection, PeerRegistry, current_peer};
use crate::sequence::SequenceGenerator;
use crate::store::CorrelationStore;
use crate::telemetry::{TRANSPORT_WS_REVERSE, record_call, record_roundtrip};
use crate::types::{ActionRequest, extract_result};

/// Calls actions over connections that bot peers opened to us.
///
/// The reply arrives later on the inbound side of the same connection;
/// whoever reads that side must hand each frame to
/// [`CorrelationStore::resolve_frame`] on [`WsReverseApi::store`].
#[derive(Clone)]
pub struct WsReverseApi {
    peers: Arc<PeerRegistry>,
    store: Arc<CorrelationStore>,
    seq: Arc<SequenceGenerator>,
}

impl WsReverseApi {
    pub fn new(peers: Arc<PeerRegistry>) -> Self {
        Self::with_parts(
            peers,
            Arc::new(CorrelationStore::new()),
            Arc::new(SequenceGenerator::new()),
        )
    }

    /// Like [`WsReverseApi::new`], with replies awaited for
    /// `config.call_timeout`.
    pub fn from_config(peers: Arc<PeerRegistry>, config: &ApiConfig) -> Self {
        Self::with_parts(
            peers,
            Arc::new(CorrelationStore::with_timeout(config.call_timeout)),
            Arc::new(SequenceGenerator::new()),
        )
    }

    pub fn with_parts(
        peers: Arc<PeerRegistry>,
        store: Arc<CorrelationStore>,
        seq: Arc<SequenceGenerator>,
    ) -> Self {
        Self { peers, store, seq }
    }

    pub fn store(&self) -> &Arc<CorrelationStore> {
        &self.store
    }

    pub fn peers(&self) -> &Arc<PeerRegistry> {
        &self.peers
    }

    /// Picks the connection for a call: the peer whose event is being
    /// handled, then an explicit `self_id` param, then the only connection.
    ///
    /// An explicit `self_id` without a connection selects nothing; the call
    /// must not leave through another bot's connection.
    fn select(&self, request: &ActionRequest) -> Option<(String, Arc<dyn PeerConnection>)> {
        if let Some(self_id) = current_peer() {
            if let Some(conn) = self.peers.get(&self_id) {
                return Some((self_id, conn));
            }
        }
        match request.self_id() {
            Some(self_id) => {
                let conn = self.peers.get(&self_id)?;
                Some((self_id, conn))
            }
            None => self.peers.sole(),
        }
    }

    async fn send_and_wait(
        &self,
        conn: Arc<dyn PeerConnection>,
        request: &ActionRequest,
    ) -> ApiResult<Value> {
        let seq = self.seq.next();
        let pending = self.store.register(seq)?;
        let frame = json!({
            "action": request.action(),
            "params": request.params(),
            "echo": { "seq": seq },
        });
        debug!(seq, "sending action frame");

        let started = Instant::now();
        conn.send_text(frame.to_string()).await?;
        let reply = pending.wait().await?;
        record_roundtrip(TRANSPORT_WS_REVERSE, started.elapsed());
        extract_result(reply)
    }
}

#[async_trait]
impl Api for WsReverseApi {
    #[instrument(
        name = "botapi.ws_reverse.call",
        skip(self, request),
        fields(action = %request.action(), self_id = tracing::field::Empty)
    )]
    async fn call(&self, request: ActionRequest) -> ApiResult<Value> {
        let Some((self_id, conn)) = self.select(&request) else {
            return Err(ApiError::TransportUnavailable);
        };
        tracing::Span::current().record("self_id", tracing::field::display(&self_id));

        let result = self.send_and_wait(conn, &request).await;
        record_call(TRANSPORT_WS_REVERSE, &result);
        result
    }
}
