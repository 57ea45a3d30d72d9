use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gateway::StudentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    Create,
    Edit,
}

/// Raw field values exactly as entered, pre-coercion. An empty string
/// means the field is blank/absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormFields {
    pub name: String,
    pub roll_number: String,
    pub student_class: String,
    pub marks: String,
    pub gender: String,
    pub contact: String,
}

pub type FieldErrors = BTreeMap<&'static str, String>;

/// Maps each failing field to a human-readable message; passing fields
/// are absent. Pure: no side effects, same input same output.
///
/// The roll-number uniqueness check is advisory only. It runs against the
/// last-fetched snapshot, which may be stale; the store's conflict
/// response stays authoritative.
pub fn validate_record(
    fields: &FormFields,
    mode: FormMode,
    snapshot: &[StudentRecord],
) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if fields.name.trim().is_empty() {
        errors.insert("name", "Name is required".to_string());
    }
    if fields.student_class.trim().is_empty() {
        errors.insert("studentClass", "Class is required".to_string());
    }

    let marks = fields.marks.trim();
    if marks.is_empty() {
        errors.insert("marks", "Marks are required".to_string());
    } else if !marks.chars().all(|c| c.is_ascii_digit()) {
        errors.insert("marks", "Marks must be a number".to_string());
    } else {
        match marks.parse::<i64>() {
            Ok(v) if (0..=100).contains(&v) => {}
            // Parse overflow on an absurdly long digit run is out of range too.
            _ => {
                errors.insert("marks", "Marks must be between 0 and 100".to_string());
            }
        }
    }

    if mode == FormMode::Create {
        let roll = fields.roll_number.trim();
        if roll.is_empty() {
            errors.insert("rollNumber", "Roll number is required".to_string());
        } else if snapshot
            .iter()
            .any(|r| r.roll_number.trim().eq_ignore_ascii_case(roll))
        {
            errors.insert("rollNumber", "Roll number already exists".to_string());
        }
    }

    let contact = fields.contact.trim();
    if !contact.is_empty() && !contact_looks_valid(contact) {
        errors.insert("contact", "Contact must be a valid phone number".to_string());
    }

    errors
}

// 7 to 24 characters: digits, spaces, parentheses, `+`, `-`.
fn contact_looks_valid(contact: &str) -> bool {
    let len = contact.chars().count();
    (7..=24).contains(&len)
        && contact
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '(' | ')' | '+' | '-'))
}
