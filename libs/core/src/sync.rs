use std::sync::Arc;
use std::thread::JoinHandle;

use serde_json::Value;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tracing::warn;

use crate::api::{BlockingApi, SharedApi};
use crate::error::{ApiError, ApiResult};
use crate::types::ActionRequest;

/// Runs calls of an async [`crate::Api`] on a tokio runtime and blocks the
/// calling thread until they finish.
///
/// Must not be called from a thread that is driving that runtime: the call
/// would wait on work that can only progress on the thread it blocks. Tokio
/// panics in that case rather than deadlocking.
pub struct SyncApi {
    api: SharedApi,
    handle: Handle,
    _runtime: Option<DedicatedRuntime>,
}

impl SyncApi {
    pub fn new(api: SharedApi, handle: Handle) -> Self {
        Self {
            api,
            handle,
            _runtime: None,
        }
    }

    /// Starts a single-threaded runtime on its own thread for the calls. The
    /// runtime stops when the adapter is dropped.
    pub fn with_dedicated_runtime(api: SharedApi) -> ApiResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name("botapi-sync")
            .build()
            .map_err(|err| ApiError::Internal(format!("failed to build runtime: {err}")))?;
        let handle = runtime.handle().clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let thread = std::thread::Builder::new()
            .name("botapi-sync".into())
            .spawn(move || {
                runtime.block_on(async {
                    let _ = shutdown_rx.await;
                });
            })
            .map_err(|err| ApiError::Internal(format!("failed to spawn runtime thread: {err}")))?;

        Ok(Self {
            api,
            handle,
            _runtime: Some(DedicatedRuntime {
                shutdown: Some(shutdown_tx),
                thread: Some(thread),
            }),
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl BlockingApi for SyncApi {
    fn call_blocking(&self, request: ActionRequest) -> ApiResult<Value> {
        let api = Arc::clone(&self.api);
        let (tx, rx) = oneshot::channel();
        self.handle.spawn(async move {
            let _ = tx.send(api.call(request).await);
        });
        rx.blocking_recv().map_err(|_| {
            ApiError::Internal("runtime dropped the call before it completed".into())
        })?
    }
}

struct DedicatedRuntime {
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for DedicatedRuntime {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("botapi-sync runtime thread panicked");
            }
        }
    }
}
