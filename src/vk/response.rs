//! Detection of VK error payloads.
//!
//! Only error detection is done here. Successful payloads are handed to the
//! request continuation as raw text.

use serde_json::Value;

/// VK error code for a recipient who has not allowed messages from the community.
pub const DISALLOWED_ERROR_CODE: i64 = 901;

/// An error reported by the VK API in the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// `error_code`, if present.
    pub code: Option<i64>,
    /// `error_msg`, if present.
    pub message: Option<String>,
    /// `user_id` echoed back in `request_params`, if present.
    pub user_id: Option<String>,
}

impl ApiError {
    /// Whether the recipient has opted out of community messages.
    pub fn is_disallowed(&self) -> bool {
        self.code == Some(DISALLOWED_ERROR_CODE)
    }
}

/// Outcome of inspecting a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Not an error payload.
    Payload,
    /// VK rejected the call.
    Error(ApiError),
}

/// Inspect a non-empty response body.
///
/// The body is an error only if it is a JSON object whose first property is
/// named `error` (case-insensitive). Returns the parse error for bodies that
/// are not JSON at all.
pub fn classify(body: &str) -> Result<Classification, serde_json::Error> {
    let value: Value = serde_json::from_str(body)?;

    let Value::Object(map) = value else {
        return Ok(Classification::Payload);
    };

    match map.iter().next() {
        Some((name, error)) if name.eq_ignore_ascii_case("error") => {
            Ok(Classification::Error(parse_api_error(error)))
        }
        _ => Ok(Classification::Payload),
    }
}

fn parse_api_error(error: &Value) -> ApiError {
    let code = error.get("error_code").and_then(Value::as_i64);
    let message = error
        .get("error_msg")
        .and_then(Value::as_str)
        .map(str::to_string);
    let user_id = error
        .get("request_params")
        .and_then(Value::as_array)
        .and_then(|params| {
            params
                .iter()
                .find(|param| param.get("key").and_then(Value::as_str) == Some("user_id"))
        })
        .and_then(|param| param.get("value"))
        .and_then(value_to_string);

    ApiError {
        code,
        message,
        user_id,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
