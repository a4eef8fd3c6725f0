use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::store::DEFAULT_CALL_TIMEOUT;

pub const ENV_API_ROOT: &str = "BOT_API_ROOT";
pub const ENV_ACCESS_TOKEN: &str = "BOT_ACCESS_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "BOT_API_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_root: Option<String>,
    pub access_token: Option<String>,
    pub call_timeout: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Blank values count as unset. A
    /// timeout that is not a positive number of seconds is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let call_timeout = match read(ENV_TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("{ENV_TIMEOUT_SECS}=`{raw}` is not a number"))?;
                if secs == 0 {
                    bail!("{ENV_TIMEOUT_SECS} must be at least 1 second");
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_CALL_TIMEOUT,
        };

        Ok(Self {
            api_root: read(ENV_API_ROOT),
            access_token: read(ENV_ACCESS_TOKEN),
            call_timeout,
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_root: None,
            access_token: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}
