use crate::config::DispatchConfig;
use crate::domain::model::{DispatchFailure, DispatchOutcome, Envelope};
use crate::domain::ports::{DispatchObserver, EventTransport, TracingObserver};
use crate::utils::error::Result;
use crate::utils::validation::validate_positive_number;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type ProgressFn<'a> = dyn Fn(usize, usize) + Send + Sync + 'a;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Pause between two batches. Not applied after the last one.
    pub batch_delay: Duration,
    /// Upper bound for one whole batch to settle.
    pub batch_timeout: Option<Duration>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            batch_delay: Duration::from_millis(crate::config::DEFAULT_BATCH_DELAY_MS),
            batch_timeout: None,
        }
    }
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            batch_delay: config.batch_delay(),
            batch_timeout: config.batch_timeout(),
        }
    }
}

/// Sends events in fixed-size batches. Every event of a batch is in flight at
/// the same time; the next batch starts once all of them have settled.
pub struct BatchDispatcher<T: EventTransport> {
    transport: T,
    settings: DispatchSettings,
    observer: Arc<dyn DispatchObserver>,
}

impl<T: EventTransport> BatchDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            settings: DispatchSettings::default(),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Best effort: every event is attempted exactly once, failures are
    /// collected per event and never stop later batches. The only error is an
    /// invalid `batch_size`.
    pub async fn dispatch<E: Envelope>(
        &self,
        events: &[E],
        target_url: &str,
        batch_size: usize,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<DispatchOutcome> {
        validate_positive_number("batch_size", batch_size, 1)?;

        let total_events = events.len();
        let batch_count = total_events.div_ceil(batch_size);
        let mut processed_count = 0;
        let mut errors = Vec::new();

        self.observer
            .on_dispatch_start(total_events, batch_count, target_url);

        for (batch_index, chunk) in events.chunks(batch_size).enumerate() {
            let batch = batch_index + 1;
            let first = batch_index * batch_size;
            self.observer.on_batch_start(batch, first..first + chunk.len());

            let started = Instant::now();
            let settled = self.settle_batch(batch, chunk, target_url).await;

            let mut succeeded = 0;
            let mut failed = 0;
            match settled {
                Ok(results) => {
                    for (event, result) in chunk.iter().zip(results) {
                        match result {
                            Ok(()) => succeeded += 1,
                            Err(error) => {
                                failed += 1;
                                errors.push(self.record_failure(event, error));
                            }
                        }
                    }
                }
                Err(batch_error) => {
                    for event in chunk {
                        failed += 1;
                        errors.push(self.record_failure(event, batch_error.clone()));
                    }
                }
            }

            processed_count += succeeded;
            self.observer
                .on_batch_end(batch, succeeded, failed, started.elapsed());
            if let Some(on_progress) = on_progress {
                on_progress(processed_count, total_events);
            }

            if batch < batch_count && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }
        }

        if total_events == 0 {
            if let Some(on_progress) = on_progress {
                on_progress(0, 0);
            }
        }

        self.observer
            .on_dispatch_complete(processed_count, total_events, errors.len());

        Ok(DispatchOutcome {
            success: errors.is_empty(),
            processed_count,
            total_events,
            errors,
        })
    }

    /// Joins every send of the batch. `Err` means the batch as a whole did not
    /// settle, in which case no per-event result is known.
    async fn settle_batch<E: Envelope>(
        &self,
        batch: usize,
        chunk: &[E],
        target_url: &str,
    ) -> std::result::Result<Vec<std::result::Result<(), String>>, String> {
        let sends = join_all(chunk.iter().map(|event| self.send_one(event, target_url)));

        match self.settings.batch_timeout {
            Some(limit) => tokio::time::timeout(limit, sends).await.map_err(|_| {
                format!("Batch {} timed out after {}ms", batch, limit.as_millis())
            }),
            None => Ok(sends.await),
        }
    }

    async fn send_one<E: Envelope>(
        &self,
        event: &E,
        target_url: &str,
    ) -> std::result::Result<(), String> {
        let body = serde_json::to_string(event)
            .map_err(|e| format!("Failed to serialize event: {}", e))?;

        self.transport
            .post_json(target_url, body)
            .await
            .map_err(|e| e.to_string())
    }

    fn record_failure<E: Envelope>(&self, event: &E, error: String) -> DispatchFailure {
        let event_id = event.event_id();
        self.observer.on_event_failed(&event_id, &error);
        DispatchFailure { event_id, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::ops::Range;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct MockError(String);

    #[derive(Default)]
    struct MockTransport {
        fail_ids: HashSet<String>,
        slow_ids: HashSet<String>,
        sent: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockTransport {
        fn failing(ids: &[&str]) -> Self {
            Self {
                fail_ids: ids.iter().map(|id| id.to_string()).collect(),
                ..Self::default()
            }
        }

        fn sent_ids(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventTransport for MockTransport {
        type Error = MockError;

        async fn post_json(&self, _target_url: &str, body: String) -> std::result::Result<(), MockError> {
            let event: Value = serde_json::from_str(&body).unwrap();
            let id = event["eventId"].as_str().unwrap().to_string();

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let pause = if self.slow_ids.contains(&id) { 500 } else { 5 };
            tokio::time::sleep(Duration::from_millis(pause)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.sent.lock().unwrap().push(id.clone());
            if self.fail_ids.contains(&id) {
                return Err(MockError(format!("HTTP 500: Internal Server Error - boom {}", id)));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        started: Mutex<Option<(usize, usize, String)>>,
        batches: Mutex<Vec<Range<usize>>>,
        starts: Mutex<Vec<Instant>>,
        ends: Mutex<Vec<Instant>>,
        completed_at: Mutex<Option<Instant>>,
        failures: Mutex<Vec<String>>,
    }

    impl DispatchObserver for RecordingObserver {
        fn on_dispatch_start(&self, total: usize, batches: usize, target_url: &str) {
            *self.started.lock().unwrap() = Some((total, batches, target_url.to_string()));
        }

        fn on_batch_start(&self, _batch: usize, events: Range<usize>) {
            self.batches.lock().unwrap().push(events);
            self.starts.lock().unwrap().push(Instant::now());
        }

        fn on_event_failed(&self, event_id: &str, _error: &str) {
            self.failures.lock().unwrap().push(event_id.to_string());
        }

        fn on_batch_end(&self, _batch: usize, _succeeded: usize, _failed: usize, _elapsed: Duration) {
            self.ends.lock().unwrap().push(Instant::now());
        }

        fn on_dispatch_complete(&self, _processed: usize, _total: usize, _failed: usize) {
            *self.completed_at.lock().unwrap() = Some(Instant::now());
        }
    }

    fn events(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| json!({"eventId": format!("evt-{}", i), "data": {"n": i}}))
            .collect()
    }

    #[tokio::test]
    async fn test_batches_are_sequential_with_delay_between() {
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher =
            BatchDispatcher::new(MockTransport::default()).with_observer(observer.clone());

        let outcome = dispatcher
            .dispatch(&events(25), "http://target", 10, None)
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.processed_count, 25);
        assert_eq!(outcome.total_events, 25);
        assert_eq!(
            *observer.started.lock().unwrap(),
            Some((25, 3, "http://target".to_string()))
        );
        assert_eq!(*observer.batches.lock().unwrap(), vec![0..10, 10..20, 20..25]);
        assert_eq!(dispatcher.transport().max_in_flight.load(Ordering::SeqCst), 10);

        let starts = observer.starts.lock().unwrap().clone();
        let ends = observer.ends.lock().unwrap().clone();
        assert!(starts[1].duration_since(ends[0]) >= Duration::from_millis(100));
        assert!(starts[2].duration_since(ends[1]) >= Duration::from_millis(100));

        let completed_at = observer.completed_at.lock().unwrap().unwrap();
        assert!(completed_at.duration_since(ends[2]) < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_failures_are_counted_per_event() {
        let observer = Arc::new(RecordingObserver::default());
        let dispatcher = BatchDispatcher::new(MockTransport::failing(&["evt-3", "evt-17"]))
            .with_observer(observer.clone());

        let outcome = dispatcher
            .dispatch(&events(25), "http://target", 10, None)
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.processed_count, 23);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].event_id, "evt-3");
        assert_eq!(outcome.errors[1].event_id, "evt-17");
        assert!(outcome.errors[0].error.contains("HTTP 500"));
        assert_eq!(*observer.failures.lock().unwrap(), vec!["evt-3", "evt-17"]);

        let mut sent = dispatcher.transport().sent_ids();
        sent.sort();
        sent.dedup();
        assert_eq!(sent.len(), 25);
        assert_eq!(dispatcher.transport().sent_ids().len(), 25);
    }

    #[tokio::test]
    async fn test_progress_reported_after_each_batch() {
        let dispatcher = BatchDispatcher::new(MockTransport::default()).with_settings(
            DispatchSettings {
                batch_delay: Duration::ZERO,
                batch_timeout: None,
            },
        );
        let progress = Mutex::new(Vec::new());
        let on_progress = |processed: usize, total: usize| {
            progress.lock().unwrap().push((processed, total));
        };

        dispatcher
            .dispatch(&events(7), "http://target", 3, Some(&on_progress))
            .await
            .unwrap();

        assert_eq!(*progress.lock().unwrap(), vec![(3, 7), (6, 7), (7, 7)]);
    }

    #[tokio::test]
    async fn test_batch_timeout_fails_whole_batch() {
        let transport = MockTransport {
            slow_ids: ["evt-1".to_string()].into_iter().collect(),
            ..MockTransport::default()
        };
        let dispatcher = BatchDispatcher::new(transport).with_settings(DispatchSettings {
            batch_delay: Duration::ZERO,
            batch_timeout: Some(Duration::from_millis(100)),
        });

        let outcome = dispatcher
            .dispatch(&events(4), "http://target", 2, None)
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.processed_count, 2);
        let failed: Vec<_> = outcome.errors.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(failed, vec!["evt-0", "evt-1"]);
        assert!(outcome
            .errors
            .iter()
            .all(|e| e.error == "Batch 1 timed out after 100ms"));
    }

    #[tokio::test]
    async fn test_empty_input_reports_success() {
        let dispatcher = BatchDispatcher::new(MockTransport::default());
        let calls = AtomicUsize::new(0);
        let on_progress = |processed: usize, total: usize| {
            assert_eq!((processed, total), (0, 0));
            calls.fetch_add(1, Ordering::SeqCst);
        };

        let outcome = dispatcher
            .dispatch::<Value>(&[], "http://target", 10, Some(&on_progress))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.total_events, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let dispatcher = BatchDispatcher::new(MockTransport::default());
        let result = dispatcher.dispatch(&events(3), "http://target", 0, None).await;
        assert!(result.is_err());
        assert!(dispatcher.transport().sent_ids().is_empty());
    }
}
