use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

pub(crate) const TIMEOUT_MESSAGE: &str = "reverse websocket api call timed out";

/// Failure kinds an action call can end with.
///
/// Only [`ApiError::TransportUnavailable`] is recoverable: it tells the
/// dispatcher to try the next transport. Every other kind is terminal for
/// the call that produced it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no api transport is available")]
    TransportUnavailable,
    #[error("action failed with retcode {}", display_retcode(.retcode))]
    ActionFailed { retcode: Option<i64> },
    #[error("http request failed with status {status}")]
    HttpFailed { status: u16 },
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn network_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ApiError::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn timeout() -> Self {
        ApiError::network(TIMEOUT_MESSAGE)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ApiError::TransportUnavailable)
    }

    /// True when a reverse websocket call gave up waiting for its reply.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Network { message, .. } if message == TIMEOUT_MESSAGE)
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::TransportUnavailable => "unavailable",
            ApiError::ActionFailed { .. } => "action_failed",
            ApiError::HttpFailed { .. } => "http_failed",
            ApiError::Network { .. } => "network",
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Internal(_) => "internal",
        }
    }
}

fn display_retcode(retcode: &Option<i64>) -> String {
    match retcode {
        Some(code) => code.to_string(),
        None => "<none>".to_string(),
    }
}
