//! Logging and trace export setup shared by bot api binaries.

use anyhow::Result;

mod config;
mod tracing_init;

pub use config::{TelemetryConfig, TelemetryProtocol};
pub use tracing_init::init_telemetry;

/// Installs the subscriber for `service_name`, configured from the
/// environment (`RUST_LOG`, `LOG_FORMAT`, `ENABLE_OTEL`, `OTEL_*`).
pub fn install(service_name: &str, service_version: &str) -> Result<()> {
    init_telemetry(TelemetryConfig::from_env(service_name, service_version))
}
