//! HTTP-layer hook that records finished requests.

use crate::events::{self, CallContext};
use crate::observe::{ApiRequestObserver, RequestDescriptor, RequestObserver, ResponseDescriptor};
use crate::AuditSink;
use parcel_audit_types::{AuditAction, AuditPriority};
use parcel_common_log::spans::request_span;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, Instrument};

/// Records finished exchanges through a list of observers.
///
/// Built with the `API_REQUEST` observer; add route-specific observers
/// with [`AuditMiddleware::with_observer`].
#[derive(Clone)]
pub struct AuditMiddleware {
    sink: Arc<dyn AuditSink>,
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl AuditMiddleware {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            observers: vec![Arc::new(ApiRequestObserver)],
        }
    }

    /// Middleware without the default `API_REQUEST` observer.
    pub fn bare(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: impl RequestObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Record a request after its response was finalised.
    pub async fn after_response(
        &self,
        request: &RequestDescriptor,
        response: &ResponseDescriptor,
        elapsed: Duration,
    ) {
        let method = request
            .method
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string());
        let span = request_span(&method, &request.endpoint);

        async {
            for observer in &self.observers {
                for event in observer.observe(request, response, elapsed) {
                    self.sink.submit(event).await;
                }
            }
            debug!(status = response.status_code, "Request audited");
        }
        .instrument(span)
        .await;
    }

    /// Record a request that failed with an unhandled error.
    pub async fn on_error(
        &self,
        request: &RequestDescriptor,
        status_code: u16,
        message: &str,
        stack: Option<String>,
    ) {
        let ctx = CallContext {
            actor: request.user.clone(),
            session_id: request.session_id.clone(),
            request: Some(request.context()),
            status_code: Some(status_code),
        };
        let event = events::error(AuditAction::ApiError, &ctx, message, stack, AuditPriority::High);
        self.sink.submit(event).await;
    }
}
