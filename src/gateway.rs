use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A student record as the store returns it. `marks` is kept as raw JSON
/// because older stores hand back numbers-as-strings; every consumer goes
/// through `stats::parse_marks` instead of trusting the type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(alias = "roll_number")]
    pub roll_number: String,
    #[serde(alias = "student_class")]
    pub student_class: String,
    #[serde(default)]
    pub marks: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl StudentRecord {
    /// Marks as they should appear in an editable text field.
    pub fn marks_text(&self) -> String {
        match &self.marks {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        }
    }
}

// Some stores use integer ids, some strings. Normalize to a string.
fn de_id<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported id value: {other}"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Name,
    RollNumber,
    StudentClass,
    Marks,
}

impl SortKey {
    /// Canonical wire name. The store historically also accepted `class`;
    /// the client only ever emits these four.
    pub fn as_query(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::RollNumber => "roll_number",
            SortKey::StudentClass => "student_class",
            SortKey::Marks => "marks",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name" => Some(SortKey::Name),
            "rollnumber" | "roll_number" => Some(SortKey::RollNumber),
            "studentclass" | "student_class" => Some(SortKey::StudentClass),
            "marks" => Some(SortKey::Marks),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_query(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Query parameters for the list endpoint. Marks bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub sort_by: SortKey,
    pub order: SortOrder,
    pub class: Option<String>,
    pub min_marks: Option<i64>,
    pub max_marks: Option<i64>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            sort_by: SortKey::Name,
            order: SortOrder::Asc,
            class: None,
            min_marks: None,
            max_marks: None,
        }
    }
}

pub fn query_pairs(query: &ListQuery) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("sort_by", query.sort_by.as_query().to_string()),
        ("order", query.order.as_query().to_string()),
    ];
    if let Some(class) = &query.class {
        pairs.push(("class", class.clone()));
    }
    if let Some(min) = query.min_marks {
        pairs.push(("min_marks", min.to_string()));
    }
    if let Some(max) = query.max_marks {
        pairs.push(("max_marks", max.to_string()));
    }
    pairs
}

/// Create payload, snake_case on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct NewStudent {
    pub name: String,
    pub roll_number: String,
    pub student_class: String,
    pub marks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

/// Update payload. `roll_number` is immutable after creation and has no
/// field here, so it can never leak into an update request.
#[derive(Debug, Clone, Serialize)]
pub struct StudentPatch {
    pub name: String,
    pub student_class: String,
    pub marks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced a server response (DNS, refused, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("record not found: {message}")]
    NotFound { message: String },

    /// The store holds a record with the same roll number.
    #[error("roll number conflict: {message}")]
    Conflict { message: String },

    /// Server-side validation rejected the payload (422).
    #[error("request rejected: {message}")]
    Rejected { message: String },

    #[error("store error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed store response: {0}")]
    Decode(String),
}

/// The remote record store, behind a trait so tests can swap in an
/// in-memory double and the base address stays an injected value.
pub trait RecordGateway {
    /// Human-readable description of where records come from.
    fn describe(&self) -> String;

    fn list(&self, query: &ListQuery) -> Result<Vec<StudentRecord>, GatewayError>;

    fn fetch(&self, id: &str) -> Result<StudentRecord, GatewayError>;

    /// Returns the created record when the store echoes it back.
    fn create(&self, student: &NewStudent) -> Result<Option<StudentRecord>, GatewayError>;

    fn update(&self, id: &str, patch: &StudentPatch) -> Result<(), GatewayError>;

    fn delete(&self, id: &str) -> Result<(), GatewayError>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpGateway {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let mut base_url = base_url.into().trim().to_string();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { client, base_url })
    }

    fn students_url(&self) -> String {
        format!("{}/students", self.base_url)
    }

    fn student_url(&self, id: &str) -> String {
        format!("{}/students/{}", self.base_url, id)
    }
}

impl RecordGateway for HttpGateway {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    fn list(&self, query: &ListQuery) -> Result<Vec<StudentRecord>, GatewayError> {
        tracing::debug!(url = %self.students_url(), "gateway list");
        let resp = self
            .client
            .get(self.students_url())
            .query(&query_pairs(query))
            .send()?;
        let (status, body) = read_body(resp)?;
        let body = check_status(status, body)?;
        let rows = match body {
            // Plain array, or an envelope with the array under `data`.
            Some(Value::Array(items)) => Value::Array(items),
            Some(Value::Object(mut map)) => match map.remove("data") {
                Some(v @ Value::Array(_)) => v,
                _ => return Err(GatewayError::Decode("list response has no records".into())),
            },
            _ => return Err(GatewayError::Decode("empty list response".into())),
        };
        serde_json::from_value(rows).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    fn fetch(&self, id: &str) -> Result<StudentRecord, GatewayError> {
        tracing::debug!(url = %self.student_url(id), "gateway fetch");
        let resp = self.client.get(self.student_url(id)).send()?;
        let (status, body) = read_body(resp)?;
        let body = check_status(status, body)?;
        let record = match body {
            Some(Value::Object(mut map)) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            Some(v) => v,
            None => return Err(GatewayError::Decode("empty record response".into())),
        };
        serde_json::from_value(record).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    fn create(&self, student: &NewStudent) -> Result<Option<StudentRecord>, GatewayError> {
        tracing::debug!(url = %self.students_url(), "gateway create");
        let resp = self.client.post(self.students_url()).json(student).send()?;
        let (status, body) = read_body(resp)?;
        let body = check_status(status, body)?;
        ensure_success(&body)?;
        // The created record is advisory; tolerate stores that omit it.
        let created = body
            .as_ref()
            .and_then(|b| b.get("data").cloned())
            .and_then(|d| serde_json::from_value(d).ok());
        Ok(created)
    }

    fn update(&self, id: &str, patch: &StudentPatch) -> Result<(), GatewayError> {
        tracing::debug!(url = %self.student_url(id), "gateway update");
        let resp = self.client.put(self.student_url(id)).json(patch).send()?;
        let (status, body) = read_body(resp)?;
        let body = check_status(status, body)?;
        ensure_success(&body)
    }

    fn delete(&self, id: &str) -> Result<(), GatewayError> {
        tracing::debug!(url = %self.student_url(id), "gateway delete");
        let resp = self.client.delete(self.student_url(id)).send()?;
        let (status, body) = read_body(resp)?;
        let body = check_status(status, body)?;
        ensure_success(&body)
    }
}

fn read_body(resp: reqwest::blocking::Response) -> Result<(u16, Option<Value>), GatewayError> {
    let status = resp.status().as_u16();
    let text = resp.text()?;
    if text.trim().is_empty() {
        return Ok((status, None));
    }
    Ok((status, serde_json::from_str(&text).ok()))
}

fn check_status(status: u16, body: Option<Value>) -> Result<Option<Value>, GatewayError> {
    if (200..300).contains(&status) {
        return Ok(body);
    }
    let fallback = match status {
        404 => "record not found",
        409 => "roll number already taken",
        _ => "the record store reported an error",
    };
    let message = failure_message(body.as_ref(), fallback);
    Err(match status {
        404 => GatewayError::NotFound { message },
        409 => GatewayError::Conflict { message },
        422 => GatewayError::Rejected { message },
        _ => GatewayError::Api { status, message },
    })
}

// A 2xx body may still carry `success: false`.
fn ensure_success(body: &Option<Value>) -> Result<(), GatewayError> {
    let Some(body) = body else {
        return Ok(());
    };
    match body.get("success").and_then(Value::as_bool) {
        Some(false) => Err(GatewayError::Api {
            status: 200,
            message: failure_message(Some(body), "the record store reported a failure"),
        }),
        _ => Ok(()),
    }
}

/// Best message the failure body offers: `message`, then `detail` as a
/// string, then `detail` as an array of `{msg}` objects.
pub fn failure_message(body: Option<&Value>, fallback: &str) -> String {
    let Some(body) = body else {
        return fallback.to_string();
    };
    if let Some(m) = body.get("message").and_then(Value::as_str) {
        if !m.trim().is_empty() {
            return m.trim().to_string();
        }
    }
    match body.get("detail") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if msgs.is_empty() {
                fallback.to_string()
            } else {
                msgs.join("; ")
            }
        }
        _ => fallback.to_string(),
    }
}
