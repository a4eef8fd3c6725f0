use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::api::{Api, SharedApi};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::http::HttpApi;
use crate::telemetry::record_failover;
use crate::types::ActionRequest;
use crate::ws_reverse::WsReverseApi;

/// Prefers the reverse websocket transport and falls back to HTTP.
///
/// Only [`ApiError::TransportUnavailable`] triggers the fallback. Timeouts,
/// network errors and action failures from the websocket side are returned
/// as they are, so a call is never sent twice.
#[derive(Clone, Default)]
pub struct UnifiedApi {
    http: Option<SharedApi>,
    ws_reverse: Option<SharedApi>,
}

impl UnifiedApi {
    pub fn new(http: Option<SharedApi>, ws_reverse: Option<SharedApi>) -> Self {
        Self { http, ws_reverse }
    }

    /// HTTP transport from `config` (when it names an api root) plus the
    /// given reverse websocket transport.
    pub fn from_config(config: &ApiConfig, ws_reverse: Option<WsReverseApi>) -> ApiResult<Self> {
        let http = match config.api_root {
            Some(_) => Some(Arc::new(HttpApi::from_config(config)?) as SharedApi),
            None => None,
        };
        Ok(Self::new(
            http,
            ws_reverse.map(|api| Arc::new(api) as SharedApi),
        ))
    }
}

#[async_trait]
impl Api for UnifiedApi {
    async fn call(&self, request: ActionRequest) -> ApiResult<Value> {
        if let Some(ws_reverse) = &self.ws_reverse {
            match ws_reverse.call(request.clone()).await {
                Err(ApiError::TransportUnavailable) => {
                    debug!(action = request.action(), "reverse websocket unavailable");
                }
                outcome => return outcome,
            }
            if self.http.is_some() {
                record_failover();
            }
        }

        match &self.http {
            Some(http) => http.call(request).await,
            None => Err(ApiError::TransportUnavailable),
        }
    }
}
