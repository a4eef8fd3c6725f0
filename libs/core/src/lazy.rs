use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{Api, BlockingApi, SharedApi};
use crate::error::{ApiError, ApiResult};
use crate::types::ActionRequest;

/// Looks up the api to use on every call.
///
/// Lets a handle exist before the real api does and follow whichever api is
/// live when the call happens. A getter returning `None` means no api is
/// live yet, which surfaces as [`ApiError::TransportUnavailable`].
pub struct LazyApi<G> {
    getter: G,
}

impl<G> LazyApi<G> {
    pub fn new(getter: G) -> Self {
        Self { getter }
    }
}

#[async_trait]
impl<G> Api for LazyApi<G>
where
    G: Fn() -> Option<SharedApi> + Send + Sync,
{
    async fn call(&self, request: ActionRequest) -> ApiResult<Value> {
        let api = (self.getter)().ok_or(ApiError::TransportUnavailable)?;
        api.call(request).await
    }
}

impl<G> BlockingApi for LazyApi<G>
where
    G: Fn() -> Option<Arc<dyn BlockingApi>> + Send + Sync,
{
    fn call_blocking(&self, request: ActionRequest) -> ApiResult<Value> {
        let api = (self.getter)().ok_or(ApiError::TransportUnavailable)?;
        api.call_blocking(request)
    }
}
