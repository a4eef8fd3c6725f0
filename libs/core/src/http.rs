use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::api::Api;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::telemetry::{TRANSPORT_HTTP, record_call, record_roundtrip};
use crate::types::{ActionRequest, extract_result};

/// Calls actions with one `POST {api_root}/{action}` each.
#[derive(Clone, Debug)]
pub struct HttpApi {
    client: Client,
    api_root: Option<String>,
    access_token: Option<String>,
}

impl HttpApi {
    pub fn new(api_root: Option<String>, access_token: Option<String>) -> Self {
        Self::with_client(Client::new(), api_root, access_token)
    }

    pub fn with_client(
        client: Client,
        api_root: Option<String>,
        access_token: Option<String>,
    ) -> Self {
        let api_root = api_root
            .map(|root| root.trim_end_matches('/').to_string())
            .filter(|root| !root.is_empty());
        let access_token = access_token.filter(|token| !token.is_empty());
        Self {
            client,
            api_root,
            access_token,
        }
    }

    /// Builds a client whose requests time out after the configured call timeout.
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.call_timeout)
            .build()
            .map_err(|err| ApiError::network_with_source("failed to build http client", err))?;
        Ok(Self::with_client(
            client,
            config.api_root.clone(),
            config.access_token.clone(),
        ))
    }

    pub fn is_available(&self) -> bool {
        self.api_root.is_some()
    }

    pub fn api_root(&self) -> Option<&str> {
        self.api_root.as_deref()
    }

    async fn post(&self, root: &str, request: &ActionRequest) -> ApiResult<Value> {
        let url = Url::parse(&format!("{root}/{}", request.action()))
            .map_err(|err| ApiError::network_with_source("api root url invalid", err))?;
        debug!(%url, "posting action");

        let mut req = self.client.post(url).json(request.params());
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }

        let started = Instant::now();
        let response = req.send().await.map_err(|err| {
            ApiError::network_with_source("http request failed with client error", err)
        })?;
        record_roundtrip(TRANSPORT_HTTP, started.elapsed());

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpFailed {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| ApiError::network_with_source("failed to read api response", err))?;
        let body: Value = serde_json::from_str(&body)
            .map_err(|err| ApiError::network_with_source("invalid JSON in api response", err))?;
        extract_result(body)
    }
}

#[async_trait]
impl Api for HttpApi {
    #[instrument(name = "botapi.http.call", skip(self, request), fields(action = %request.action()))]
    async fn call(&self, request: ActionRequest) -> ApiResult<Value> {
        let Some(root) = self.api_root.as_deref() else {
            return Err(ApiError::TransportUnavailable);
        };
        let result = self.post(root, &request).await;
        record_call(TRANSPORT_HTTP, &result);
        result
    }
}
