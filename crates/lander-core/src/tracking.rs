//! Conversion tracking.
//!
//! Events fan out to every registered [`ConversionSink`]. Tracking is never
//! allowed to block or fail a page render: page views go through
//! [`ConversionTracker::dispatch`], which runs on a background task and only
//! logs failures. Form submissions use [`ConversionTracker::record`] so the
//! handler knows whether the event landed before it answers the visitor.

use std::sync::Arc;

use lander_storage::ConversionSink;
use lander_storage::model::ConversionEvent;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::TrackingFailure;

/// Fans conversion events out to one or more sinks.
#[derive(Clone, Default)]
pub struct ConversionTracker {
    sinks: Vec<Arc<dyn ConversionSink>>,
}

impl ConversionTracker {
    /// Create a tracker with no sinks. Events are accepted and dropped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ConversionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Write `event` to every sink.
    ///
    /// All sinks are attempted even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingFailure`] naming every sink that failed.
    pub async fn record(&self, event: &ConversionEvent) -> Result<(), TrackingFailure> {
        let mut failed = Vec::new();
        let mut first_reason = None;

        for sink in &self.sinks {
            if let Err(e) = sink.record(event).await {
                warn!(
                    sink = sink.name(),
                    page_id = %event.page_id,
                    conversion_type = %event.conversion_type,
                    error = %e,
                    "conversion sink failed"
                );
                failed.push(sink.name().to_owned());
                first_reason.get_or_insert_with(|| e.to_string());
            }
        }

        match first_reason {
            None => Ok(()),
            Some(reason) => Err(TrackingFailure {
                sinks: failed.join(", "),
                reason,
            }),
        }
    }

    /// Record `event` on a background task.
    ///
    /// Failures are logged and otherwise ignored. The handle is returned for
    /// tests and shutdown; callers on the request path drop it.
    pub fn dispatch(&self, event: ConversionEvent) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            if let Err(e) = tracker.record(&event).await {
                warn!(
                    page_id = %event.page_id,
                    conversion_type = %event.conversion_type,
                    error = %e,
                    "conversion event dropped"
                );
            }
        })
    }
}

impl std::fmt::Debug for ConversionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("ConversionTracker")
            .field("sinks", &names)
            .finish()
    }
}
