//! In-process request counters exposed at `/api/metrics`.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::errors::AppError;
use crate::models::MetricsSnapshot;

/// Kinds of events the browser may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    PageView,
    ApiCall,
    Error,
}

impl MetricKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "page_view" => Some(MetricKind::PageView),
            "api_call" => Some(MetricKind::ApiCall),
            "error" => Some(MetricKind::Error),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Counters {
    page_views: u64,
    api_calls: u64,
    errors: u64,
    last_updated: DateTime<Utc>,
}

/// Counters shared by all handlers.
#[derive(Debug)]
pub struct Metrics {
    inner: Mutex<Counters>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counters {
                page_views: 0,
                api_calls: 0,
                errors: 0,
                last_updated: Utc::now(),
            }),
        }
    }

    pub fn record(&self, kind: MetricKind, value: u64) {
        let mut counters = self.inner.lock();
        match kind {
            MetricKind::PageView => counters.page_views = counters.page_views.saturating_add(value),
            MetricKind::ApiCall => counters.api_calls = counters.api_calls.saturating_add(value),
            MetricKind::Error => counters.errors = counters.errors.saturating_add(value),
        }
        counters.last_updated = Utc::now();
    }

    /// Record a report from the browser, rejecting unknown kinds.
    pub fn record_named(&self, kind: &str, value: u64) -> Result<(), AppError> {
        let kind = MetricKind::from_str(kind)
            .ok_or_else(|| AppError::BadRequest("Invalid metric type".to_string()))?;
        self.record(kind, value);
        Ok(())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.inner.lock();
        MetricsSnapshot {
            page_views: counters.page_views,
            api_calls: counters.api_calls,
            errors: counters.errors,
            last_updated: counters.last_updated,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let metrics = Metrics::new();
        metrics.record(MetricKind::ApiCall, 1);
        metrics.record(MetricKind::ApiCall, 2);
        metrics.record_named("page_view", 5).unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.api_calls, 3);
        assert_eq!(snapshot.page_views, 5);
        assert_eq!(snapshot.errors, 0);
        assert!(snapshot.timestamp >= snapshot.last_updated);
    }

    #[test]
    fn test_counters_saturate() {
        let metrics = Metrics::new();
        metrics.record_named("page_view", u64::MAX).unwrap();
        metrics.record_named("page_view", u64::MAX).unwrap();
        metrics.record(MetricKind::Error, 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.page_views, u64::MAX);
        assert_eq!(snapshot.errors, 1);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let metrics = Metrics::new();
        let err = metrics.record_named("clicks", 1).unwrap_err();
        assert_eq!(err.message(), "Invalid metric type");
    }
}
