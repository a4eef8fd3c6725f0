use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::types::{ActionRequest, Params};

/// Something that can carry an action call to the bot backend.
///
/// Implementations can use HTTP, a reverse websocket, or compose other
/// implementations; callers only see the success payload or an [`ApiError`].
#[async_trait]
pub trait Api: Send + Sync {
    async fn call(&self, request: ActionRequest) -> ApiResult<Value>;

    async fn call_action(&self, action: &str, params: Params) -> ApiResult<Value> {
        self.call(ActionRequest::new(action, params)?).await
    }
}

pub type SharedApi = Arc<dyn Api>;

#[async_trait]
impl<T: Api + ?Sized> Api for Arc<T> {
    async fn call(&self, request: ActionRequest) -> ApiResult<Value> {
        (**self).call(request).await
    }
}

/// Typed calls on top of any [`Api`].
///
/// ```no_run
/// # async fn demo(api: &dyn botapi_core::Api) -> botapi_core::ApiResult<()> {
/// use botapi_core::ApiExt;
/// use serde_json::json;
///
/// let info: serde_json::Value = api
///     .call_as("get_login_info", &json!({}))
///     .await?;
/// println!("{info}");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ApiExt: Api {
    async fn call_as<P, R>(&self, action: &str, params: &P) -> ApiResult<R>
    where
        P: Serialize + Sync + ?Sized,
        R: DeserializeOwned + Send,
    {
        let request = ActionRequest::from_serializable(action, params)?;
        let data = self.call(request).await?;
        serde_json::from_value(data).map_err(|err| {
            ApiError::network_with_source(format!("unexpected `{action}` payload"), err)
        })
    }
}

impl<T: Api + ?Sized> ApiExt for T {}

/// Blocking counterpart of [`Api`] for callers outside the async runtime.
pub trait BlockingApi: Send + Sync {
    fn call_blocking(&self, request: ActionRequest) -> ApiResult<Value>;

    fn call_action_blocking(&self, action: &str, params: Params) -> ApiResult<Value> {
        self.call_blocking(ActionRequest::new(action, params)?)
    }
}

impl<T: BlockingApi + ?Sized> BlockingApi for Arc<T> {
    fn call_blocking(&self, request: ActionRequest) -> ApiResult<Value> {
        (**self).call_blocking(request)
    }
}
