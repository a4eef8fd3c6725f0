use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// Keyword-style parameters of an action call.
pub type Params = Map<String, Value>;

/// A named action plus its parameters. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    action: String,
    params: Params,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, params: Params) -> ApiResult<Self> {
        let action = action.into();
        if action.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "action name must not be empty".into(),
            ));
        }
        Ok(Self { action, params })
    }

    /// Builds a request from any value that serializes to a JSON object.
    pub fn from_serializable<P>(action: impl Into<String>, params: &P) -> ApiResult<Self>
    where
        P: Serialize + ?Sized,
    {
        let value = serde_json::to_value(params).map_err(|err| {
            ApiError::InvalidRequest(format!("params do not serialize: {err}"))
        })?;
        let params = match value {
            Value::Object(map) => map,
            Value::Null => Params::new(),
            other => {
                return Err(ApiError::InvalidRequest(format!(
                    "params must be a JSON object, got {}",
                    json_kind(&other)
                )));
            }
        };
        Self::new(action, params)
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The `self_id` parameter as a peer identity, when it is a non-empty
    /// string or a number.
    pub fn self_id(&self) -> Option<String> {
        match self.params.get("self_id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Pulls the success payload out of a response body.
///
/// A `status` of `"failed"` becomes [`ApiError::ActionFailed`]; anything else
/// yields the `data` field, or `null` when it is missing. Bodies that are not
/// JSON objects carry no payload.
pub fn extract_result(body: Value) -> ApiResult<Value> {
    let Value::Object(mut body) = body else {
        return Ok(Value::Null);
    };
    if body.get("status").and_then(Value::as_str) == Some("failed") {
        return Err(ApiError::ActionFailed {
            retcode: body.get("retcode").and_then(Value::as_i64),
        });
    }
    Ok(body.remove("data").unwrap_or(Value::Null))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_empty_action_names() {
        let err = ActionRequest::new("  ", Params::new()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn builds_requests_from_structs() {
        #[derive(Serialize)]
        struct SendMsg<'a> {
            user_id: u64,
            message: &'a str,
        }

        let req = ActionRequest::from_serializable(
            "send_private_msg",
            &SendMsg {
                user_id: 42,
                message: "hi",
            },
        )
        .unwrap();
        assert_eq!(req.action(), "send_private_msg");
        assert_eq!(req.params()["user_id"], 42);
        assert_eq!(req.params()["message"], "hi");
    }

    #[test]
    fn rejects_non_object_params() {
        let err = ActionRequest::from_serializable("get_status", &[1, 2]).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn reads_self_id_from_strings_and_numbers() {
        let req = ActionRequest::from_serializable("x", &json!({"self_id": 10001})).unwrap();
        assert_eq!(req.self_id().as_deref(), Some("10001"));
        let req = ActionRequest::from_serializable("x", &json!({"self_id": "10002"})).unwrap();
        assert_eq!(req.self_id().as_deref(), Some("10002"));
        let req = ActionRequest::from_serializable("x", &json!({"self_id": ""})).unwrap();
        assert_eq!(req.self_id(), None);
        let req = ActionRequest::new("x", Params::new()).unwrap();
        assert_eq!(req.self_id(), None);
    }

    #[test]
    fn extracts_data_on_success() {
        let data = extract_result(json!({"status": "ok", "retcode": 0, "data": {"x": 1}}));
        assert_eq!(data.unwrap(), json!({"x": 1}));
    }

    #[test]
    fn missing_data_is_null() {
        assert_eq!(extract_result(json!({"status": "ok"})).unwrap(), Value::Null);
        assert_eq!(extract_result(json!("not an object")).unwrap(), Value::Null);
    }

    #[test]
    fn failed_status_carries_retcode() {
        let err = extract_result(json!({"status": "failed", "retcode": 100})).unwrap_err();
        assert!(matches!(err, ApiError::ActionFailed { retcode: Some(100) }));

        let err = extract_result(json!({"status": "failed"})).unwrap_err();
        assert!(matches!(err, ApiError::ActionFailed { retcode: None }));
    }

    #[test]
    fn async_status_is_not_a_failure() {
        let data = extract_result(json!({"status": "async", "retcode": 1}));
        assert_eq!(data.unwrap(), Value::Null);
    }
}
