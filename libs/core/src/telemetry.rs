use std::time::Duration;

use metrics::{counter, histogram};
use serde_json::Value;

use crate::error::ApiResult;

pub(crate) const TRANSPORT_HTTP: &str = "http";
pub(crate) const TRANSPORT_WS_REVERSE: &str = "ws_reverse";

pub(crate) fn record_call(transport: &'static str, result: &ApiResult<Value>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    counter!(
        "botapi_calls_total",
        "transport" => transport,
        "outcome" => outcome
    )
    .increment(1);
}

pub(crate) fn record_roundtrip(transport: &'static str, elapsed: Duration) {
    histogram!("botapi_roundtrip_seconds", "transport" => transport).record(elapsed.as_secs_f64());
}

pub(crate) fn record_failover() {
    counter!("botapi_failover_total").increment(1);
}
