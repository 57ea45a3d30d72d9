#![allow(dead_code)]

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use serde_json::{json, Value};
use uuid::Uuid;

use rosterd::gateway::{
    GatewayError, ListQuery, NewStudent, RecordGateway, SortKey, SortOrder, StudentPatch,
    StudentRecord,
};
use rosterd::ipc::{self, AppState, Request};
use rosterd::stats::parse_marks;

/// Shared backing store for the in-memory gateway double. Tests keep an
/// `Rc` handle so they can inspect records and inject failures after the
/// gateway is boxed into `AppState`.
#[derive(Default)]
pub struct StoreInner {
    pub records: RefCell<Vec<StudentRecord>>,
    pub fail_next_read: RefCell<Option<GatewayError>>,
    pub fail_next_write: RefCell<Option<GatewayError>>,
    pub calls: RefCell<Vec<String>>,
}

impl StoreInner {
    pub fn call_log(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn has_call(&self, prefix: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.starts_with(prefix))
    }
}

pub struct MemoryGateway {
    store: Rc<StoreInner>,
}

impl MemoryGateway {
    pub fn new(store: Rc<StoreInner>) -> Self {
        Self { store }
    }
}

fn compare(sort_by: SortKey, a: &StudentRecord, b: &StudentRecord) -> Ordering {
    match sort_by {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::RollNumber => a.roll_number.cmp(&b.roll_number),
        SortKey::StudentClass => a.student_class.cmp(&b.student_class),
        SortKey::Marks => match (parse_marks(&a.marks), parse_marks(&b.marks)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

impl RecordGateway for MemoryGateway {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn list(&self, query: &ListQuery) -> Result<Vec<StudentRecord>, GatewayError> {
        self.store.calls.borrow_mut().push(format!(
            "list sort_by={} order={}",
            query.sort_by.as_query(),
            query.order.as_query()
        ));
        if let Some(e) = self.store.fail_next_read.borrow_mut().take() {
            return Err(e);
        }

        let mut rows: Vec<StudentRecord> = self.store.records.borrow().clone();
        if let Some(class) = &query.class {
            rows.retain(|r| &r.student_class == class);
        }
        if let Some(min) = query.min_marks {
            rows.retain(|r| parse_marks(&r.marks).map(|m| m >= min as f64).unwrap_or(false));
        }
        if let Some(max) = query.max_marks {
            rows.retain(|r| parse_marks(&r.marks).map(|m| m <= max as f64).unwrap_or(false));
        }
        let desc = query.order == SortOrder::Desc;
        // Stable sort: ties keep insertion order in either direction.
        rows.sort_by(|a, b| {
            let cmp = compare(query.sort_by, a, b);
            if desc {
                cmp.reverse()
            } else {
                cmp
            }
        });
        Ok(rows)
    }

    fn fetch(&self, id: &str) -> Result<StudentRecord, GatewayError> {
        self.store.calls.borrow_mut().push(format!("fetch {id}"));
        if let Some(e) = self.store.fail_next_read.borrow_mut().take() {
            return Err(e);
        }
        self.store
            .records
            .borrow()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(GatewayError::NotFound {
                message: "record not found".to_string(),
            })
    }

    fn create(&self, student: &NewStudent) -> Result<Option<StudentRecord>, GatewayError> {
        self.store
            .calls
            .borrow_mut()
            .push(format!("create {}", student.roll_number));
        if let Some(e) = self.store.fail_next_write.borrow_mut().take() {
            return Err(e);
        }
        let duplicate = self
            .store
            .records
            .borrow()
            .iter()
            .any(|r| r.roll_number.eq_ignore_ascii_case(&student.roll_number));
        if duplicate {
            return Err(GatewayError::Conflict {
                message: "roll number already taken".to_string(),
            });
        }
        let record = StudentRecord {
            id: Uuid::new_v4().to_string(),
            name: student.name.clone(),
            roll_number: student.roll_number.clone(),
            student_class: student.student_class.clone(),
            marks: json!(student.marks),
            gender: student.gender.clone(),
            contact: student.contact.clone(),
        };
        self.store.records.borrow_mut().push(record.clone());
        Ok(Some(record))
    }

    fn update(&self, id: &str, patch: &StudentPatch) -> Result<(), GatewayError> {
        self.store.calls.borrow_mut().push(format!("update {id}"));
        if let Some(e) = self.store.fail_next_write.borrow_mut().take() {
            return Err(e);
        }
        let mut records = self.store.records.borrow_mut();
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Err(GatewayError::NotFound {
                message: "record not found".to_string(),
            });
        };
        // Roll number stays as created; the patch has no such field.
        record.name = patch.name.clone();
        record.student_class = patch.student_class.clone();
        record.marks = json!(patch.marks);
        record.gender = patch.gender.clone();
        record.contact = patch.contact.clone();
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), GatewayError> {
        self.store.calls.borrow_mut().push(format!("delete {id}"));
        if let Some(e) = self.store.fail_next_write.borrow_mut().take() {
            return Err(e);
        }
        let mut records = self.store.records.borrow_mut();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(GatewayError::NotFound {
                message: "record not found".to_string(),
            });
        }
        Ok(())
    }
}

pub fn record(id: &str, name: &str, roll: &str, class: &str, marks: i64) -> StudentRecord {
    StudentRecord {
        id: id.to_string(),
        name: name.to_string(),
        roll_number: roll.to_string(),
        student_class: class.to_string(),
        marks: json!(marks),
        gender: None,
        contact: None,
    }
}

pub fn record_with_marks(id: &str, name: &str, roll: &str, class: &str, marks: Value) -> StudentRecord {
    StudentRecord {
        id: id.to_string(),
        name: name.to_string(),
        roll_number: roll.to_string(),
        student_class: class.to_string(),
        marks,
        gender: None,
        contact: None,
    }
}

/// App state wired to an in-memory store seeded with `records`.
pub fn seeded_state(records: Vec<StudentRecord>) -> (AppState, Rc<StoreInner>) {
    let store = Rc::new(StoreInner::default());
    store.records.borrow_mut().extend(records);
    let state = AppState::new(Some(Box::new(MemoryGateway::new(store.clone()))));
    (state, store)
}

pub fn request(state: &mut AppState, id: &str, method: &str, params: Value) -> Value {
    ipc::handle_request(
        state,
        Request {
            id: id.to_string(),
            method: method.to_string(),
            params,
        },
    )
}

pub fn request_ok(state: &mut AppState, id: &str, method: &str, params: Value) -> Value {
    let resp = request(state, id, method, params);
    assert_eq!(
        resp.get("ok").and_then(Value::as_bool),
        Some(true),
        "expected ok response: {resp}"
    );
    resp.get("result").cloned().expect("result")
}

pub fn request_err(state: &mut AppState, id: &str, method: &str, params: Value) -> Value {
    let resp = request(state, id, method, params);
    assert_eq!(
        resp.get("ok").and_then(Value::as_bool),
        Some(false),
        "expected error response: {resp}"
    );
    resp.get("error").cloned().expect("error")
}

pub fn error_code(error: &Value) -> &str {
    error.get("code").and_then(Value::as_str).unwrap_or("")
}

pub fn student_names(result: &Value) -> Vec<String> {
    result
        .get("students")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|r| r.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
