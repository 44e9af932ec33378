use crate::config::FacilityRegistry;
use crate::domain::model::{row_number, Row, FIELD_CENTER_NAME, FIELD_NAME, FIELD_PHONE};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub const REQUIRED_FIELDS: [&str; 2] = [FIELD_NAME, FIELD_PHONE];

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9\s\-\(\)]{10,}$").expect("phone pattern is valid"));

/// One problem found in one row. `row` is the spreadsheet row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub row: usize,
    pub message: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<RowIssue>,
}

impl ValidationReport {
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

pub struct RowValidator {
    facilities: FacilityRegistry,
}

impl RowValidator {
    pub fn new(facilities: FacilityRegistry) -> Self {
        Self { facilities }
    }

    pub fn facilities(&self) -> &FacilityRegistry {
        &self.facilities
    }

    /// Checks every row and returns the rendered `Row <n>: ...` messages.
    pub fn validate(&self, rows: &[Row]) -> Vec<String> {
        self.validate_rows(rows).messages()
    }

    pub fn validate_rows(&self, rows: &[Row]) -> ValidationReport {
        let errors = rows
            .iter()
            .enumerate()
            .flat_map(|(index, row)| self.check_row(row_number(index), row))
            .collect();

        ValidationReport { errors }
    }

    fn check_row(&self, row: usize, data: &Row) -> Vec<RowIssue> {
        let mut issues = Vec::new();

        for field in REQUIRED_FIELDS {
            let present = data
                .text(field)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false);
            if !present {
                issues.push(RowIssue {
                    row,
                    message: format!("Missing required field \"{}\"", field),
                });
            }
        }

        if let Some(phone) = data.text(FIELD_PHONE).filter(|p| !p.is_empty()) {
            if !PHONE_PATTERN.is_match(&phone) {
                issues.push(RowIssue {
                    row,
                    message: "Invalid phone number format".to_string(),
                });
            }
        }

        if let Some(center) = data.text(FIELD_CENTER_NAME).filter(|c| !c.is_empty()) {
            let center = center.trim();
            if !self.facilities.contains(center) {
                let mut message = format!(
                    "Invalid Center Name \"{}\". Must exactly match one of the approved centers.",
                    center
                );
                let suggestions = self.facilities.suggestions(center);
                if !suggestions.is_empty() {
                    message.push_str(&format!(" Did you mean: {}?", suggestions.join(", ")));
                }
                issues.push(RowIssue { row, message });
            }
        }

        issues
    }
}

impl Default for RowValidator {
    fn default() -> Self {
        Self::new(FacilityRegistry::bundled())
    }
}
