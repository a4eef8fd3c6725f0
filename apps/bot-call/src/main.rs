use std::sync::Arc;

use anyhow::{Context, Result, bail};
use botapi_core::{
    ApiConfig, BlockingApi, ENV_ACCESS_TOKEN, ENV_API_ROOT, ENV_TIMEOUT_SECS, Params, SyncApi,
    UnifiedApi,
};
use clap::Parser;
use serde_json::Value;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "bot-call",
    version,
    about = "Invoke one bot api action over HTTP and print its result"
)]
struct Cli {
    /// Root URL of the bot HTTP api.
    #[arg(long, env = "BOT_API_ROOT", value_name = "URL")]
    api_root: Option<String>,
    /// Bearer token sent with the call.
    #[arg(long, env = "BOT_ACCESS_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    access_token: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, env = "BOT_API_TIMEOUT_SECS", value_name = "SECS")]
    timeout: Option<String>,
    /// Action name, e.g. send_private_msg.
    action: String,
    /// Parameters as key=value; values that parse as JSON are sent as JSON.
    #[arg(value_name = "KEY=VALUE")]
    params: Vec<String>,
}

impl Cli {
    /// Flags and their env fallbacks, validated the same way as
    /// [`ApiConfig::from_env`].
    fn config(&self) -> Result<ApiConfig> {
        ApiConfig::from_lookup(|key| match key {
            ENV_API_ROOT => self.api_root.clone(),
            ENV_ACCESS_TOKEN => self.access_token.clone(),
            ENV_TIMEOUT_SECS => self.timeout.clone(),
            _ => None,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    botapi_telemetry::install("bot-call", env!("CARGO_PKG_VERSION"))?;

    let config = cli.config()?;
    let params = parse_params(&cli.params)?;
    info!(action = %cli.action, params = params.len(), "calling action");

    let api = UnifiedApi::from_config(&config, None).context("failed to set up http api")?;
    let api = SyncApi::with_dedicated_runtime(Arc::new(api))?;
    let data = api
        .call_action_blocking(&cli.action, params)
        .with_context(|| format!("action `{}` failed", cli.action))?;

    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

fn parse_params(raw: &[String]) -> Result<Params> {
    let mut params = Params::new();
    for pair in raw {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("parameter `{pair}` is not in key=value form");
        };
        if key.is_empty() {
            bail!("parameter `{pair}` has an empty key");
        }
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        params.insert(key.to_string(), value);
    }
    Ok(params)
}
