//! Action calls against bot-protocol backends.
//!
//! An action is a named remote operation (`send_msg`, `get_login_info`, ...)
//! with keyword-style parameters. This crate carries such calls over one of
//! two transports and hides which one was used:
//!
//! - [`HttpApi`] posts each call to `{api_root}/{action}`.
//! - [`WsReverseApi`] writes a frame on a connection the bot peer opened to
//!   us and waits for the reply carrying the same `echo.seq`.
//!
//! [`UnifiedApi`] prefers the websocket and falls back to HTTP when no
//! connection is available. [`SyncApi`] and [`LazyApi`] adapt any of them
//! for blocking callers and for handles created before the api exists.
pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod lazy;
pub mod peer;
pub mod sequence;
pub mod store;
pub mod sync;
mod telemetry;
pub mod types;
pub mod unified;
pub mod ws_reverse;

pub use api::{Api, ApiExt, BlockingApi, SharedApi};
pub use config::{ApiConfig, ENV_ACCESS_TOKEN, ENV_API_ROOT, ENV_TIMEOUT_SECS};
pub use error::{ApiError, ApiResult};
pub use http::HttpApi;
pub use lazy::LazyApi;
pub use peer::{ChannelConnection, PeerConnection, PeerRegistry, current_peer, with_peer};
pub use sequence::{CorrelationId, SequenceGenerator};
pub use store::{CorrelationStore, DEFAULT_CALL_TIMEOUT, PendingCall};
pub use sync::SyncApi;
pub use types::{ActionRequest, Params, extract_result};
pub use unified::UnifiedApi;
pub use ws_reverse::WsReverseApi;
