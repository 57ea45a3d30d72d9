use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::{ListQuery, RecordGateway, StudentRecord};
use crate::validate::{FieldErrors, FormFields, FormMode};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub gateway: Option<Box<dyn RecordGateway>>,
    pub roster: RosterState,
    pub form: FormState,
}

impl AppState {
    pub fn new(gateway: Option<Box<dyn RecordGateway>>) -> Self {
        Self {
            gateway,
            roster: RosterState::default(),
            form: FormState::default(),
        }
    }

    /// A new store invalidates every cached snapshot.
    pub fn reset_views(&mut self) {
        self.roster = RosterState::default();
        self.form = FormState::default();
    }
}

/// The list view's cache of the last successful fetch, plus the query
/// that produced it. Never authoritative; refetched after mutations.
#[derive(Debug, Default)]
pub struct RosterState {
    pub records: Vec<StudentRecord>,
    pub query: ListQuery,
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormPhase {
    Idle,
    Success,
    Error,
}

/// Form view state. `snapshot` backs the advisory roll-number uniqueness
/// check in create mode.
#[derive(Debug)]
pub struct FormState {
    pub open: bool,
    pub mode: FormMode,
    pub student_id: Option<String>,
    pub fields: FormFields,
    pub errors: FieldErrors,
    pub phase: FormPhase,
    pub snapshot: Vec<StudentRecord>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            open: false,
            mode: FormMode::Create,
            student_id: None,
            fields: FormFields::default(),
            errors: BTreeMap::new(),
            phase: FormPhase::Idle,
            snapshot: Vec::new(),
        }
    }
}
