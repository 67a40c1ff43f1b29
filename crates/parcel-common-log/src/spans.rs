//! Span helpers for the audit pipeline.

use std::time::{Duration, Instant};
use tracing::{field, info_span, Span};

/// Span around a batch flush.
pub fn flush_span(batch_len: usize) -> Span {
    info_span!("audit_flush", batch = batch_len, inserted = field::Empty, error = field::Empty)
}

/// Span around an observed inbound request.
pub fn request_span(method: &str, endpoint: &str) -> Span {
    info_span!("audit_request", method = %method, endpoint = %endpoint, error = field::Empty)
}

/// Span around a read-side query operation.
pub fn query_span(operation: &'static str) -> Span {
    info_span!("audit_query", op = operation, error = field::Empty)
}

/// Record an error on the current span.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", field::display(error));
}

/// Timing utility for operations.
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// Complete the timer, log and return the elapsed time.
    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_ms = %duration.as_millis(),
            "operation completed"
        );
        duration
    }
}

/// Time a block of code at debug level.
#[macro_export]
macro_rules! timed {
    ($name:expr, $body:expr) => {{
        let _timer = $crate::spans::Timer::start($name);
        let result = $body;
        _timer.finish();
        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Instrument;
    use tracing_subscriber::EnvFilter;

    fn with_subscriber<F>(f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(EnvFilter::new("trace"))
            .finish();

        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_nested_spans_record_fields() {
        with_subscriber(|| {
            let request = request_span("POST", "/api/lands");
            let _outer = request.enter();

            let flush = flush_span(12);
            let _inner = flush.enter();
            flush.record("inserted", 12);

            let error = std::io::Error::new(std::io::ErrorKind::TimedOut, "store timed out");
            record_error(&error);
            assert!(!flush.is_disabled());
        });
    }

    #[tokio::test]
    async fn test_span_propagates_across_await() {
        let span = query_span("summary");
        async {
            tracing::info!("inside query");
            tokio::task::yield_now().await;
        }
        .instrument(span)
        .await;
    }

    #[test]
    fn test_timer_reports_elapsed() {
        let timer = Timer::start("sleep");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.finish() >= Duration::from_millis(5));
    }

    #[test]
    fn test_timed_macro_returns_body_value() {
        with_subscriber(|| {
            let result = crate::timed!("macro", { 2 + 2 });
            assert_eq!(result, 4);
        });
    }
}
