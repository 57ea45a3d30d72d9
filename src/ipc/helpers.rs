use serde_json::{json, Value};

use super::error::err;
use super::types::{AppState, Request};
use crate::gateway::{GatewayError, RecordGateway};

/// Data methods need a configured store first.
pub fn require_gateway<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a dyn RecordGateway, Value> {
    match state.gateway.as_deref() {
        Some(gateway) => Ok(gateway),
        None => Err(err(
            &req.id,
            "no_gateway",
            "configure the record store first",
            None,
        )),
    }
}

pub fn str_param(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Optional integer param; `null` counts as absent, anything else
/// non-integer is a caller bug.
pub fn opt_i64_param(params: &Value, key: &str) -> Result<Option<i64>, String> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => match v.as_i64() {
            Some(n) => Ok(Some(n)),
            None => Err(format!("{key} must be an integer")),
        },
    }
}

/// Converts a gateway failure into the IPC error envelope.
pub fn gateway_err(req_id: &str, e: &GatewayError) -> Value {
    match e {
        GatewayError::Transport(inner) => err(
            req_id,
            "gateway_unreachable",
            "could not reach the record store",
            Some(json!({ "cause": inner.to_string() })),
        ),
        GatewayError::NotFound { message } => err(req_id, "not_found", message.clone(), None),
        GatewayError::Conflict { message } => err(req_id, "conflict", message.clone(), None),
        GatewayError::Rejected { message } => err(req_id, "rejected", message.clone(), None),
        GatewayError::Api { status, message } => err(
            req_id,
            "gateway_error",
            message.clone(),
            Some(json!({ "status": status })),
        ),
        GatewayError::Decode(message) => err(req_id, "bad_response", message.clone(), None),
    }
}

/// Message shown to the user when a submission fails: the server's own
/// words when it gave any, a generic phrase otherwise.
pub fn user_message(e: &GatewayError) -> String {
    match e {
        GatewayError::Transport(_) => "could not reach the record store".to_string(),
        GatewayError::NotFound { message }
        | GatewayError::Conflict { message }
        | GatewayError::Rejected { message }
        | GatewayError::Api { message, .. } => message.clone(),
        GatewayError::Decode(_) => "the record store returned an unreadable response".to_string(),
    }
}
