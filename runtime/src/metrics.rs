//! Prometheus metrics for the request pipeline.
//!
//! Metric collection is split in two:
//! - [`MetricsExporter`] installs the global Prometheus recorder and renders
//!   the scrape text
//! - [`RequestMetrics`] provides phase steps that record attempts, outcomes and
//!   latency per operation; [`RetryMetrics`] is recorded by the retry policy
//!
//! Without an installed recorder every `metrics` macro is a no-op, so the
//! steps are safe to install unconditionally.
//!
//! # Example
//!
//! ```rust,no_run
//! use reqchain_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // Serve this from your own /metrics endpoint
//! let text = exporter.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use reqchain_core::{Handlers, NamedHandler, Request};
use thiserror::Error;

// Re-export metrics macros for use in custom steps
pub use metrics::{counter, gauge, histogram};

/// Name of the Send step installed by [`RequestMetrics::attempt_handler`]
pub const ATTEMPT_HANDLER: &str = "reqchain.metrics.Attempt";
/// Name of the Send step installed by [`RequestMetrics::transport_failure_handler`]
pub const TRANSPORT_FAILURE_HANDLER: &str = "reqchain.metrics.TransportFailure";
/// Name of the Unmarshal step installed by [`RequestMetrics::success_handler`]
pub const SUCCESS_HANDLER: &str = "reqchain.metrics.Success";
/// Name of the UnmarshalError step installed by [`RequestMetrics::failure_handler`]
pub const FAILURE_HANDLER: &str = "reqchain.metrics.Failure";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder wrapper.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter; nothing is recorded until [`install`](Self::install).
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., in tests), this succeeds
    /// without a handle and [`render`](Self::render) returns `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "reqchain_request_attempts_total",
        "Total number of transport round trips attempted"
    );
    describe_counter!(
        "reqchain_requests_succeeded_total",
        "Total number of requests whose response was unmarshaled"
    );
    describe_counter!(
        "reqchain_requests_failed_total",
        "Total number of requests that ended with an error"
    );
    describe_histogram!(
        "reqchain_request_duration_seconds",
        "Time from request creation to successful unmarshal"
    );

    describe_counter!(
        "retry_attempts_total",
        "Total number of retry attempts"
    );
    describe_counter!(
        "retry_successes_total",
        "Total number of requests that succeeded after retrying"
    );
    describe_counter!(
        "retry_exhausted_total",
        "Total number of requests that exhausted max retries"
    );
}

/// Request metrics recorder.
pub struct RequestMetrics;

impl RequestMetrics {
    /// Record a round trip about to be issued.
    pub fn record_attempt(operation: &str) {
        counter!("reqchain_request_attempts_total", "operation" => operation.to_string())
            .increment(1);
    }

    /// Record a completed request.
    pub fn record_success(operation: &str, duration_secs: f64) {
        counter!("reqchain_requests_succeeded_total", "operation" => operation.to_string())
            .increment(1);
        histogram!("reqchain_request_duration_seconds", "operation" => operation.to_string())
            .record(duration_secs);
    }

    /// Record a failed request.
    pub fn record_failure(operation: &str, code: &str) {
        counter!(
            "reqchain_requests_failed_total",
            "operation" => operation.to_string(),
            "code" => code.to_string()
        )
        .increment(1);
    }

    /// Send step, installed first: counts every attempt.
    #[must_use]
    pub fn attempt_handler() -> NamedHandler {
        NamedHandler::new(ATTEMPT_HANDLER, |request: &mut Request| {
            Self::record_attempt(&request.operation.name);
        })
    }

    /// Send step, installed last: counts round trips that failed outright.
    ///
    /// These end the request without reaching UnmarshalError.
    #[must_use]
    pub fn transport_failure_handler() -> NamedHandler {
        NamedHandler::new(TRANSPORT_FAILURE_HANDLER, |request: &mut Request| {
            if request.error.is_some() {
                Self::record_failure(&request.operation.name, "transport");
            }
        })
    }

    /// Unmarshal step: counts the success and its latency.
    #[must_use]
    pub fn success_handler() -> NamedHandler {
        NamedHandler::new(SUCCESS_HANDLER, |request: &mut Request| {
            if request.error.is_some() {
                return;
            }
            let elapsed = request.service.clock().now() - request.time;
            let seconds = elapsed.to_std().map(|d| d.as_secs_f64()).unwrap_or_default();
            Self::record_success(&request.operation.name, seconds);
            if request.retry_count > 0 {
                RetryMetrics::record_success();
            }
        })
    }

    /// UnmarshalError step: counts the failure by error code.
    #[must_use]
    pub fn failure_handler() -> NamedHandler {
        NamedHandler::new(FAILURE_HANDLER, |request: &mut Request| {
            let Some(error) = &request.error else {
                return;
            };
            let code = error.code().unwrap_or("unknown");
            Self::record_failure(&request.operation.name, code);
        })
    }

    /// Install all request steps.
    pub fn install(handlers: &mut Handlers) {
        handlers.send.push_front_named(Self::attempt_handler());
        handlers.send.push_back_named(Self::transport_failure_handler());
        handlers.unmarshal.push_back_named(Self::success_handler());
        handlers.unmarshal_error.push_back_named(Self::failure_handler());
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_exporter_creation() {
        let exporter = MetricsExporter::new();
        assert!(exporter.handle().is_none());
        assert!(exporter.render().is_none());
    }

    #[test]
    fn test_metrics_exporter_install() {
        let mut exporter = MetricsExporter::new();
        assert!(exporter.install().is_ok());
        // Note: handle might be None if another test already installed the recorder
        assert!(exporter.install().is_ok());
    }

    #[test]
    fn test_request_metrics_render() {
        let mut exporter = MetricsExporter::new();
        exporter.install().unwrap();

        RequestMetrics::record_attempt("ListItems");
        RequestMetrics::record_success("ListItems", 0.2);
        RequestMetrics::record_failure("ListItems", "ThrottlingException");
        RetryMetrics::record_attempt();

        // If this test runs after another test installed the recorder,
        // handle might be None. That's OK - metrics are still being recorded.
        if let Some(rendered) = exporter.render() {
            assert!(rendered.contains("reqchain_request_attempts_total"));
            assert!(rendered.contains("reqchain_requests_failed_total"));
            assert!(rendered.contains("retry_attempts_total"));
        }
    }

    #[test]
    fn test_install_places_steps() {
        let mut handlers = Handlers::new();
        handlers.send.push_back("transport", |_| {});
        RequestMetrics::install(&mut handlers);

        assert_eq!(
            handlers.send.names(),
            [ATTEMPT_HANDLER, "transport", TRANSPORT_FAILURE_HANDLER]
        );
        assert_eq!(handlers.unmarshal.names(), [SUCCESS_HANDLER]);
        assert_eq!(handlers.unmarshal_error.names(), [FAILURE_HANDLER]);
    }
}
