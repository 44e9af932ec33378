use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

pub const FIELD_NAME: &str = "Name";
pub const FIELD_PHONE: &str = "Phone";
pub const FIELD_CENTER_NAME: &str = "Center Name";
pub const FIELD_CITY: &str = "City";
pub const FIELD_ZONE: &str = "Zone";
pub const FIELD_DOCTOR_NAME: &str = "Doctor Name";
pub const FIELD_DEPARTMENT: &str = "Department";

/// Offset between a 0-based data index and the spreadsheet row number
/// (1-based rows plus the header row).
pub const HEADER_ROW_OFFSET: usize = 2;

pub fn row_number(index: usize) -> usize {
    index + HEADER_ROW_OFFSET
}

/// One spreadsheet record. Columns keep the order they had in the sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and adapters.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .rev()
            .find(|(key, _)| key == column)
            .map(|(_, value)| value)
    }

    /// Cell rendered as text. Null cells count as absent.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(cell_to_string)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

pub fn cell_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Canonical key -> trimmed value. Keys stay in column order and serialize
/// as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRow {
    entries: Vec<(String, String)>,
}

impl NormalizedRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// An existing key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|entry| entry.0 == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.0 == key)
            .map(|entry| entry.1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NormalizedRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for NormalizedRow {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl Serialize for NormalizedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for NormalizedRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NormalizedRowVisitor;

        impl<'de> Visitor<'de> for NormalizedRowVisitor {
            type Value = NormalizedRow;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut row = NormalizedRow::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    row.insert(key, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(NormalizedRowVisitor)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    #[serde(rename = "patient_data_upload")]
    PatientDataUpload,
    #[serde(rename = "IP Feedback")]
    IpFeedback,
    #[serde(rename = "OPD Feedback")]
    OpdFeedback,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    #[default]
    #[serde(rename = "excel_upload")]
    ExcelUpload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    pub source: EventSource,
    pub file_name: String,
    pub row_number: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: Uuid,
    pub transaction_id: Uuid,
    pub timestamp: String,
    pub event_type: EventType,
    pub data: NormalizedRow,
    pub metadata: EventMetadata,
}

/// Anything the dispatcher can relay: a JSON body plus the id used for
/// failure accounting.
pub trait Envelope: Serialize + Send + Sync {
    fn event_id(&self) -> String;
}

impl Envelope for Event {
    fn event_id(&self) -> String {
        self.event_id.to_string()
    }
}

impl Envelope for Value {
    fn event_id(&self) -> String {
        self.get("eventId")
            .and_then(cell_to_string)
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchFailure {
    pub event_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub success: bool,
    pub processed_count: usize,
    pub total_events: usize,
    pub errors: Vec<DispatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadIssue {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub success: bool,
    pub processed_rows: usize,
    pub errors: Vec<UploadIssue>,
    pub event_ids: Vec<Uuid>,
}
