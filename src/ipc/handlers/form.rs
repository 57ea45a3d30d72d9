use serde_json::{json, Value};

use crate::gateway::{GatewayError, ListQuery, NewStudent, StudentPatch};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{gateway_err, require_gateway, str_param, user_message};
use crate::ipc::types::{AppState, FormPhase, FormState, Request};
use crate::validate::{validate_record, FormFields, FormMode};

/// Keeps the success acknowledgment visible before the chrome navigates.
const NAVIGATE_DELAY_MS: u64 = 800;

fn opt_text(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

fn handle_open(state: &mut AppState, req: &Request) -> Value {
    let Some(mode_raw) = str_param(&req.params, "mode") else {
        return err(&req.id, "bad_params", "missing mode", None);
    };
    let mode = match mode_raw.as_str() {
        "create" => FormMode::Create,
        "edit" => FormMode::Edit,
        other => {
            return err(
                &req.id,
                "bad_params",
                format!("unknown form mode: {other}"),
                None,
            )
        }
    };

    let gateway = match require_gateway(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };

    match mode {
        FormMode::Create => {
            // Advisory only: a failed refresh still opens the form.
            let snapshot = match gateway.list(&ListQuery::default()) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(error = %e, "uniqueness snapshot fetch failed");
                    Vec::new()
                }
            };
            state.form = FormState {
                open: true,
                mode,
                snapshot,
                ..FormState::default()
            };
            ok(
                &req.id,
                json!({
                    "mode": mode,
                    "fields": state.form.fields,
                    "phase": state.form.phase,
                }),
            )
        }
        FormMode::Edit => {
            let Some(student_id) = str_param(&req.params, "studentId") else {
                return err(&req.id, "bad_params", "missing studentId", None);
            };
            match gateway.fetch(&student_id) {
                Ok(record) => {
                    let fields = FormFields {
                        name: record.name.clone(),
                        roll_number: record.roll_number.clone(),
                        student_class: record.student_class.clone(),
                        marks: record.marks_text(),
                        gender: record.gender.clone().unwrap_or_default(),
                        contact: record.contact.clone().unwrap_or_default(),
                    };
                    state.form = FormState {
                        open: true,
                        mode,
                        student_id: Some(record.id),
                        fields,
                        ..FormState::default()
                    };
                    ok(
                        &req.id,
                        json!({
                            "mode": mode,
                            "studentId": state.form.student_id,
                            "fields": state.form.fields,
                            "phase": state.form.phase,
                        }),
                    )
                }
                Err(e) => gateway_err(&req.id, &e),
            }
        }
    }
}

fn handle_edit(state: &mut AppState, req: &Request) -> Value {
    if !state.form.open {
        return err(&req.id, "bad_params", "open a form first", None);
    }
    let Some(field) = str_param(&req.params, "field") else {
        return err(&req.id, "bad_params", "missing field", None);
    };
    let Some(value) = req.params.get("value").and_then(Value::as_str) else {
        return err(&req.id, "bad_params", "value must be a string", None);
    };

    let key: &'static str = match field.as_str() {
        "name" => {
            state.form.fields.name = value.to_string();
            "name"
        }
        "rollNumber" => {
            if state.form.mode == FormMode::Edit {
                return err(&req.id, "bad_params", "roll number cannot be changed", None);
            }
            state.form.fields.roll_number = value.to_string();
            "rollNumber"
        }
        "studentClass" => {
            state.form.fields.student_class = value.to_string();
            "studentClass"
        }
        "marks" => {
            state.form.fields.marks = value.to_string();
            "marks"
        }
        "gender" => {
            state.form.fields.gender = value.to_string();
            "gender"
        }
        "contact" => {
            state.form.fields.contact = value.to_string();
            "contact"
        }
        other => {
            return err(
                &req.id,
                "bad_params",
                format!("unknown field: {other}"),
                None,
            )
        }
    };

    // Any edit clears that field's error and re-arms the form.
    state.form.errors.remove(key);
    state.form.phase = FormPhase::Idle;
    ok(
        &req.id,
        json!({
            "fields": state.form.fields,
            "fieldErrors": state.form.errors,
            "phase": state.form.phase,
        }),
    )
}

fn conflict_result(state: &mut AppState, req: &Request, fields: &FormFields, message: String) -> Value {
    state.form.errors.insert("rollNumber", message.clone());
    state.form.phase = FormPhase::Error;
    ok(
        &req.id,
        json!({
            "status": "conflict",
            "message": message,
            "fieldErrors": state.form.errors,
            "fields": fields,
            "phase": state.form.phase,
        }),
    )
}

fn failure_result(state: &mut AppState, req: &Request, fields: &FormFields, e: &GatewayError) -> Value {
    tracing::warn!(error = %e, "form submit failed");
    state.form.phase = FormPhase::Error;
    ok(
        &req.id,
        json!({
            "status": "error",
            "message": user_message(e),
            "fields": fields,
            "phase": state.form.phase,
        }),
    )
}

fn handle_submit(state: &mut AppState, req: &Request) -> Value {
    if !state.form.open {
        return err(&req.id, "bad_params", "open a form first", None);
    }
    let mode = state.form.mode;
    let fields = state.form.fields.clone();

    let errors = validate_record(&fields, mode, &state.form.snapshot);
    if !errors.is_empty() {
        // Blocks the round-trip entirely; nothing reaches the store.
        state.form.errors = errors;
        state.form.phase = FormPhase::Error;
        return ok(
            &req.id,
            json!({
                "status": "invalid",
                "fieldErrors": state.form.errors,
                "fields": fields,
                "phase": state.form.phase,
            }),
        );
    }

    // Validation guarantees an in-range, all-digit value.
    let marks = fields.marks.trim().parse::<i64>().unwrap_or_default();
    let gender = opt_text(&fields.gender);
    let contact = opt_text(&fields.contact);

    let gateway = match require_gateway(state, req) {
        Ok(g) => g,
        Err(resp) => return resp,
    };

    match mode {
        FormMode::Create => {
            let draft = NewStudent {
                name: fields.name.trim().to_string(),
                roll_number: fields.roll_number.trim().to_string(),
                student_class: fields.student_class.trim().to_string(),
                marks,
                gender,
                contact,
            };
            match gateway.create(&draft) {
                Ok(created) => {
                    // Refresh the advisory snapshot so the next entry sees
                    // the roll number that was just taken.
                    let snapshot = match gateway.list(&ListQuery::default()) {
                        Ok(rows) => rows,
                        Err(e) => {
                            tracing::warn!(error = %e, "uniqueness snapshot refresh failed");
                            Vec::new()
                        }
                    };
                    state.form.fields = FormFields::default();
                    state.form.errors.clear();
                    state.form.snapshot = snapshot;
                    state.form.phase = FormPhase::Success;
                    let mut result = json!({
                        "status": "success",
                        "message": "Student added",
                        "fields": state.form.fields,
                        "phase": state.form.phase,
                        "navigateAfterMs": NAVIGATE_DELAY_MS,
                    });
                    if let Some(record) = created {
                        result["record"] = json!(record);
                    }
                    ok(&req.id, result)
                }
                Err(GatewayError::Conflict { message }) => {
                    conflict_result(state, req, &fields, message)
                }
                Err(e) => failure_result(state, req, &fields, &e),
            }
        }
        FormMode::Edit => {
            let Some(student_id) = state.form.student_id.clone() else {
                return err(&req.id, "bad_params", "form has no target record", None);
            };
            let patch = StudentPatch {
                name: fields.name.trim().to_string(),
                student_class: fields.student_class.trim().to_string(),
                marks,
                gender,
                contact,
            };
            match gateway.update(&student_id, &patch) {
                Ok(()) => {
                    state.form.errors.clear();
                    state.form.phase = FormPhase::Success;
                    ok(
                        &req.id,
                        json!({
                            "status": "success",
                            "message": "Student updated",
                            "fields": fields,
                            "phase": state.form.phase,
                            "navigateAfterMs": NAVIGATE_DELAY_MS,
                        }),
                    )
                }
                Err(GatewayError::Conflict { message }) => {
                    conflict_result(state, req, &fields, message)
                }
                Err(e) => failure_result(state, req, &fields, &e),
            }
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "form.open" => Some(handle_open(state, req)),
        "form.edit" => Some(handle_edit(state, req)),
        "form.submit" => Some(handle_submit(state, req)),
        _ => None,
    }
}
