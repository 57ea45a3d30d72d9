use chrono::Utc;
use serde_json::{json, Value};

use crate::gateway::{ListQuery, SortKey, SortOrder};
use crate::ipc::error::ok;
use crate::ipc::helpers::{gateway_err, require_gateway};
use crate::ipc::types::{AppState, Request};
use crate::stats;

/// Fetches the full roster (marks descending) and derives everything the
/// dashboard renders. Purely read-only; no mutation originates here.
fn handle_load(state: &mut AppState, req: &Request) -> Value {
    let gateway = match require_gateway(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };

    let query = ListQuery {
        sort_by: SortKey::Marks,
        order: SortOrder::Desc,
        ..ListQuery::default()
    };
    match gateway.list(&query) {
        Ok(records) => {
            let summary = stats::compute_roster_summary(&records);
            let mut result = serde_json::to_value(&summary).unwrap_or_else(|_| json!({}));
            if let Value::Object(map) = &mut result {
                map.insert("fetchedAt".to_string(), json!(Utc::now()));
            }
            ok(&req.id, result)
        }
        Err(e) => {
            tracing::warn!(error = %e, "summary load failed");
            gateway_err(&req.id, &e)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "summary.load" => Some(handle_load(state, req)),
        _ => None,
    }
}
