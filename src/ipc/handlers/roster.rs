use chrono::Utc;
use serde_json::{json, Value};

use crate::gateway::{ListQuery, SortKey, SortOrder, StudentRecord};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{gateway_err, opt_i64_param, require_gateway, str_param, user_message};
use crate::ipc::types::{AppState, Request, RosterState};

fn parse_load_query(params: &Value) -> Result<ListQuery, String> {
    let mut query = ListQuery::default();

    if let Some(raw) = params.get("sortBy") {
        if !raw.is_null() {
            let Some(s) = raw.as_str() else {
                return Err("sortBy must be a string".into());
            };
            let Some(key) = SortKey::parse(s) else {
                return Err(format!("unknown sort column: {s}"));
            };
            query.sort_by = key;
        }
    }

    if let Some(raw) = params.get("order") {
        if !raw.is_null() {
            let Some(order) = raw.as_str().and_then(SortOrder::parse) else {
                return Err("order must be asc or desc".into());
            };
            query.order = order;
        }
    }

    match params.get("class") {
        None => {}
        Some(v) if v.is_null() => {}
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err("class must be a string".into());
            };
            let t = s.trim();
            if !t.is_empty() {
                query.class = Some(t.to_string());
            }
        }
    }

    query.min_marks = opt_i64_param(params, "minMarks")?;
    query.max_marks = opt_i64_param(params, "maxMarks")?;

    Ok(query)
}

fn rows_result(roster: &RosterState) -> Value {
    json!({
        "students": roster.records,
        "sortBy": roster.query.sort_by,
        "order": roster.query.order,
        "filters": {
            "class": roster.query.class,
            "minMarks": roster.query.min_marks,
            "maxMarks": roster.query.max_marks,
        },
        "fetchedAt": roster.fetched_at,
    })
}

fn load_with_query(state: &mut AppState, req: &Request, query: ListQuery) -> Value {
    let gateway = match require_gateway(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    match gateway.list(&query) {
        Ok(records) => {
            state.roster = RosterState {
                records,
                query,
                fetched_at: Some(Utc::now()),
            };
            ok(&req.id, rows_result(&state.roster))
        }
        Err(e) => {
            // Previous snapshot stays put; the chrome keeps showing it.
            tracing::warn!(error = %e, "roster load failed");
            gateway_err(&req.id, &e)
        }
    }
}

fn handle_load(state: &mut AppState, req: &Request) -> Value {
    let query = match parse_load_query(&req.params) {
        Ok(q) => q,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    load_with_query(state, req, query)
}

/// Header-click semantics: the active column toggles direction, a new
/// column becomes the key ascending. Filters carry over; the new sort is
/// only committed once the reload succeeds.
fn handle_sort(state: &mut AppState, req: &Request) -> Value {
    let Some(column_raw) = str_param(&req.params, "column") else {
        return err(&req.id, "bad_params", "missing column", None);
    };
    let Some(column) = SortKey::parse(&column_raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown sort column: {column_raw}"),
            None,
        );
    };

    let mut query = state.roster.query.clone();
    if query.sort_by == column {
        query.order = query.order.toggled();
    } else {
        query.sort_by = column;
        query.order = SortOrder::Asc;
    }
    load_with_query(state, req, query)
}

fn matches_search(record: &StudentRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    record.name.to_ascii_lowercase().contains(needle)
        || record.roll_number.to_ascii_lowercase().contains(needle)
}

/// Pure projection over the cached snapshot; never fetches.
fn handle_search(state: &mut AppState, req: &Request) -> Value {
    let raw = req.params.get("query").and_then(Value::as_str).unwrap_or("");
    let needle = raw.trim().to_ascii_lowercase();
    let students: Vec<&StudentRecord> = state
        .roster
        .records
        .iter()
        .filter(|r| matches_search(r, &needle))
        .collect();
    ok(&req.id, json!({ "students": students, "query": raw }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Value {
    let Some(student_id) = str_param(&req.params, "studentId") else {
        return err(&req.id, "bad_params", "missing studentId", None);
    };
    let confirmed = req
        .params
        .get("confirm")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !confirmed {
        // Hand back the name so the chrome's modal can say who it is about.
        let name = state
            .roster
            .records
            .iter()
            .find(|r| r.id == student_id)
            .map(|r| r.name.clone());
        return err(
            &req.id,
            "confirm_required",
            "deletion must be confirmed",
            Some(json!({ "studentId": student_id, "name": name })),
        );
    }

    let gateway = match require_gateway(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };
    if let Err(e) = gateway.delete(&student_id) {
        tracing::warn!(error = %e, "delete failed");
        return gateway_err(&req.id, &e);
    }

    // Successful mutation invalidates the cache; reload with the query
    // the list is currently showing.
    let query = state.roster.query.clone();
    match gateway.list(&query) {
        Ok(records) => {
            state.roster.records = records;
            state.roster.fetched_at = Some(Utc::now());
            let mut result = rows_result(&state.roster);
            if let Value::Object(map) = &mut result {
                map.insert("deleted".to_string(), json!(true));
            }
            ok(&req.id, result)
        }
        Err(e) => {
            // The delete itself went through; say so instead of erroring.
            tracing::warn!(error = %e, "post-delete reload failed");
            ok(
                &req.id,
                json!({
                    "deleted": true,
                    "refreshed": false,
                    "message": user_message(&e),
                }),
            )
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "roster.load" => Some(handle_load(state, req)),
        "roster.search" => Some(handle_search(state, req)),
        "roster.sort" => Some(handle_sort(state, req)),
        "roster.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
