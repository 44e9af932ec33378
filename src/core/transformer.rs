use crate::domain::model::{
    cell_to_string, row_number, Event, EventMetadata, EventSource, EventType, NormalizedRow, Row,
};
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Turns validated rows into webhook events.
#[derive(Debug, Clone, Default)]
pub struct EventTransformer {
    event_type: EventType,
}

impl EventTransformer {
    pub fn new(event_type: EventType) -> Self {
        Self { event_type }
    }

    /// One event per row. Rows are not validated here.
    pub fn to_events(&self, rows: &[Row], file_name: &str) -> Vec<Event> {
        rows.iter()
            .enumerate()
            .map(|(index, row)| Event {
                event_id: Uuid::new_v4(),
                transaction_id: Uuid::new_v4(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                event_type: self.event_type,
                data: normalize(row),
                metadata: EventMetadata {
                    source: EventSource::ExcelUpload,
                    file_name: file_name.to_string(),
                    row_number: row_number(index),
                },
            })
            .collect()
    }
}

/// Canonicalizes column names and drops empty cells (null, `""`, or
/// whitespace only). Keys keep column order; a later column that collapses to
/// an earlier key overwrites its value in place.
pub fn normalize(row: &Row) -> NormalizedRow {
    let mut normalized = NormalizedRow::new();

    for (column, value) in row.cells() {
        let Some(text) = cell_to_string(value) else {
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let Some(key) = normalize_key(column) else {
            continue;
        };
        normalized.insert(key, text);
    }

    normalized
}

/// `"  Doctor's Name "` -> `Some("doctors_name")`. Returns `None` when nothing
/// survives.
pub fn normalize_key(column: &str) -> Option<String> {
    let lowered = column.trim().to_lowercase();

    let mut key = String::with_capacity(lowered.len());
    let mut in_whitespace = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                key.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            key.push(ch);
        }
    }

    let mut collapsed = String::with_capacity(key.len());
    for ch in key.chars() {
        if ch == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(ch);
    }

    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::collections::HashSet;

    #[test]
    fn test_normalize_drops_empty_and_canonicalizes_keys() {
        let row = Row::new()
            .with("Center Name", "Chandigarh Sec 44")
            .with("Notes", "");

        let normalized = normalize(&row);
        assert_eq!(
            normalized,
            NormalizedRow::from([("center_name", "Chandigarh Sec 44")])
        );
    }

    #[test]
    fn test_normalize_key_rules() {
        assert_eq!(normalize_key("Name").as_deref(), Some("name"));
        assert_eq!(normalize_key("  Doctor   Name ").as_deref(), Some("doctor_name"));
        assert_eq!(normalize_key("Doctor's Name").as_deref(), Some("doctors_name"));
        assert_eq!(normalize_key("Phone (Mobile)").as_deref(), Some("phone_mobile"));
        assert_eq!(normalize_key("_IP__No._").as_deref(), Some("ip_no"));
        assert_eq!(normalize_key("Zone - A").as_deref(), Some("zone_a"));
        assert_eq!(normalize_key("Età").as_deref(), Some("et"));
        assert_eq!(normalize_key("***"), None);
        assert_eq!(normalize_key("   "), None);
    }

    #[test]
    fn test_normalize_values() {
        let row = Row::new()
            .with("Name", "  Asha  ")
            .with("Age", 31)
            .with("Consent", true)
            .with("Ward", Value::Null)
            .with("Blank", "   ");

        let normalized = normalize(&row);
        assert_eq!(normalized.get("name"), Some("Asha"));
        assert_eq!(normalized.get("age"), Some("31"));
        assert_eq!(normalized.get("consent"), Some("true"));
        assert!(!normalized.contains_key("ward"));
        assert!(!normalized.contains_key("blank"));
    }

    #[test]
    fn test_normalize_last_write_wins() {
        let row = Row::new()
            .with("Doctor Name", "Dr. Mehta")
            .with("doctor_name", "Dr. Iyer");

        assert_eq!(
            normalize(&row).get("doctor_name"),
            Some("Dr. Iyer")
        );
    }

    #[test]
    fn test_normalize_keeps_column_order() {
        let row = Row::new()
            .with("Phone", "9876543210")
            .with("Name", "Asha")
            .with("Center Name", "Chandigarh Sec 44")
            .with("Age", 31);

        let keys: Vec<_> = normalize(&row).keys().map(str::to_string).collect();
        assert_eq!(keys, vec!["phone", "name", "center_name", "age"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let row = Row::new()
            .with("Name", " Asha ")
            .with("Doctor Name", "Dr. Mehta")
            .with("Center  Name", "Chandigarh Sec 44")
            .with("Remarks!", "call after 5");

        let once = normalize(&row);
        let again: Row = once.iter().collect();
        assert_eq!(normalize(&again), once);
    }

    #[test]
    fn test_to_events_metadata_and_ids() {
        let rows = vec![
            Row::new().with("Name", "Asha").with("Phone", "9876543210"),
            Row::new().with("Name", "Ravi").with("Phone", "9876500000"),
            Row::new().with("Name", "Meera").with("Phone", "9876511111"),
        ];

        let events = EventTransformer::default().to_events(&rows, "contacts.xlsx");

        assert_eq!(events.len(), 3);
        for (index, event) in events.iter().enumerate() {
            assert_eq!(event.metadata.row_number, index + 2);
            assert_eq!(event.metadata.file_name, "contacts.xlsx");
            assert_eq!(event.metadata.source, EventSource::ExcelUpload);
            assert_eq!(event.event_type, EventType::PatientDataUpload);
            assert_ne!(event.event_id, event.transaction_id);
            assert!(chrono::DateTime::parse_from_rfc3339(&event.timestamp).is_ok());
            assert!(event.timestamp.ends_with('Z'));
        }
        assert_eq!(events[1].data.get("name"), Some("Ravi"));

        let ids: HashSet<_> = events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_to_events_uses_configured_event_type() {
        let rows = vec![Row::new().with("Name", "Asha")];
        let events = EventTransformer::new(EventType::IpFeedback).to_events(&rows, "ip.csv");
        assert_eq!(events[0].event_type, EventType::IpFeedback);
    }
}
