use async_trait::async_trait;
use std::ops::Range;
use std::time::Duration;

/// Outbound delivery of a single serialized event.
#[async_trait]
pub trait EventTransport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn post_json(&self, target_url: &str, body: String) -> Result<(), Self::Error>;
}

/// Hooks the dispatcher calls while it works. All methods default to no-ops.
pub trait DispatchObserver: Send + Sync {
    fn on_dispatch_start(&self, _total: usize, _batches: usize, _target_url: &str) {}

    /// `events` is the slice of the full event list covered by this batch.
    fn on_batch_start(&self, _batch: usize, _events: Range<usize>) {}

    fn on_event_failed(&self, _event_id: &str, _error: &str) {}

    fn on_batch_end(&self, _batch: usize, _succeeded: usize, _failed: usize, _elapsed: Duration) {}

    fn on_dispatch_complete(&self, _processed: usize, _total: usize, _failed: usize) {}
}

/// Logs dispatch progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn on_dispatch_start(&self, total: usize, batches: usize, target_url: &str) {
        tracing::info!(
            "🚀 Starting to send {} events to {} in {} batches",
            total,
            target_url,
            batches
        );
    }

    fn on_batch_start(&self, batch: usize, events: Range<usize>) {
        tracing::info!(
            batch,
            "📦 Processing batch {}, events {}-{}",
            batch,
            events.start + 1,
            events.end
        );
    }

    fn on_event_failed(&self, event_id: &str, error: &str) {
        tracing::warn!(event_id, "❌ Event delivery failed: {}", error);
    }

    fn on_batch_end(&self, batch: usize, succeeded: usize, failed: usize, elapsed: Duration) {
        tracing::debug!(
            batch,
            succeeded,
            failed,
            "Batch {} settled in {:?}",
            batch,
            elapsed
        );
    }

    fn on_dispatch_complete(&self, processed: usize, total: usize, failed: usize) {
        tracing::info!(
            "✅ Finished sending events. Success: {}/{}, Errors: {}",
            processed,
            total,
            failed
        );
    }
}
