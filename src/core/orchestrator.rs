use crate::core::dispatcher::{BatchDispatcher, ProgressFn};
use crate::core::transformer::EventTransformer;
use crate::core::validator::{RowValidator, ValidationReport};
use crate::domain::model::{Event, Row, UploadIssue, UploadResult};
use crate::domain::ports::EventTransport;
use crate::utils::error::Result;
use crate::utils::validation::validate_url;
use std::collections::HashMap;

/// Validate → transform → dispatch for one uploaded sheet.
pub struct UploadOrchestrator<T: EventTransport> {
    validator: RowValidator,
    transformer: EventTransformer,
    dispatcher: BatchDispatcher<T>,
}

impl<T: EventTransport> UploadOrchestrator<T> {
    pub fn new(
        validator: RowValidator,
        transformer: EventTransformer,
        dispatcher: BatchDispatcher<T>,
    ) -> Self {
        Self {
            validator,
            transformer,
            dispatcher,
        }
    }

    pub fn validator(&self) -> &RowValidator {
        &self.validator
    }

    pub fn transformer(&self) -> &EventTransformer {
        &self.transformer
    }

    pub fn dispatcher(&self) -> &BatchDispatcher<T> {
        &self.dispatcher
    }

    /// Validates and, when every row passes, builds events without sending them.
    pub fn prepare(&self, rows: &[Row], file_name: &str) -> std::result::Result<Vec<Event>, ValidationReport> {
        let report = self.validator.validate_rows(rows);
        if !report.valid() {
            return Err(report);
        }
        Ok(self.transformer.to_events(rows, file_name))
    }

    /// Runs the whole upload. Validation problems come back inside the result
    /// with nothing sent; the error path is reserved for a bad target URL or
    /// batch size.
    pub async fn run(
        &self,
        rows: &[Row],
        file_name: &str,
        target_url: &str,
        batch_size: usize,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<UploadResult> {
        validate_url("target_url", target_url)?;

        if rows.is_empty() {
            tracing::warn!("📭 {} has no data rows, nothing to upload", file_name);
            return Ok(UploadResult {
                success: false,
                processed_rows: 0,
                errors: vec![UploadIssue {
                    row: 0,
                    message: "No data rows to upload".to_string(),
                }],
                event_ids: Vec::new(),
            });
        }

        tracing::info!("🔍 Validating {} rows from {}", rows.len(), file_name);
        let events = match self.prepare(rows, file_name) {
            Ok(events) => events,
            Err(report) => {
                tracing::warn!(
                    "❌ Validation failed with {} errors, nothing was sent",
                    report.errors.len()
                );
                return Ok(UploadResult {
                    success: false,
                    processed_rows: 0,
                    errors: report
                        .errors
                        .into_iter()
                        .map(|issue| UploadIssue {
                            row: issue.row,
                            message: issue.to_string(),
                        })
                        .collect(),
                    event_ids: Vec::new(),
                });
            }
        };

        tracing::info!("🔧 Built {} events, dispatching", events.len());
        let outcome = self
            .dispatcher
            .dispatch(&events, target_url, batch_size, on_progress)
            .await?;

        let rows_by_event: HashMap<String, usize> = events
            .iter()
            .map(|event| (event.event_id.to_string(), event.metadata.row_number))
            .collect();

        let errors = outcome
            .errors
            .iter()
            .map(|failure| UploadIssue {
                row: rows_by_event.get(&failure.event_id).copied().unwrap_or(0),
                message: format!("Event {}: {}", failure.event_id, failure.error),
            })
            .collect();

        Ok(UploadResult {
            success: outcome.success,
            processed_rows: outcome.processed_count,
            errors,
            event_ids: events.iter().map(|event| event.event_id).collect(),
        })
    }
}
