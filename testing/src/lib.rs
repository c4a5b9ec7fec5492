//! # reqchain testing
//!
//! Testing utilities for reqchain request pipelines.
//!
//! This crate provides:
//! - [`MockTransport`]: scripted responses, recorded requests
//! - [`FixedClock`]: deterministic request timestamps
//! - [`PhaseRecorder`]: the order in which phases ran
//! - [`RequestTest`]: Given-When-Then assertions on one request
//!
//! ## Example
//!
//! ```
//! use reqchain_core::{Config, HttpResponse, Operation, Service};
//! use reqchain_runtime::{DefaultHandlers, RetryPolicy};
//! use reqchain_testing::{MockTransport, test_clock};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.push_response(HttpResponse::new(200, r#"{"Count":1}"#));
//!
//! let config = Config::builder().endpoint("https://example.com").build();
//! let mut service = Service::new(config).unwrap().with_clock(Arc::new(test_clock()));
//! DefaultHandlers::new(transport.clone())
//!     .with_retry_policy(RetryPolicy::none())
//!     .install(&mut service);
//!
//! let service = Arc::new(service);
//! let mut request = service.new_request(
//!     Arc::new(Operation::new("Count")),
//!     serde_json::json!({}),
//!     serde_json::Value::Null,
//! );
//! request.send().unwrap();
//!
//! assert_eq!(request.data_as::<serde_json::Value>(), Some(&serde_json::json!({"Count": 1})));
//! assert_eq!(transport.call_count(), 1);
//! ```

use chrono::{DateTime, Utc};
use reqchain_core::Clock;

mod request_test;

pub use request_test::{RequestTest, Step, assertions};

/// Mock implementations of the pipeline's collaborators.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use reqchain_core::{Error, Handlers, HttpRequest, HttpResponse, Phase};
    use reqchain_runtime::Transport;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use reqchain_testing::mocks::FixedClock;
    /// use reqchain_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Transport that replays scripted outcomes in order.
    ///
    /// Every request it receives is recorded. Once the script runs out each
    /// round trip fails with [`Error::Transport`].
    #[derive(Debug, Default)]
    pub struct MockTransport {
        script: Mutex<VecDeque<Result<HttpResponse, Error>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        /// Create a transport with an empty script
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response.
        pub fn push_response(&self, response: HttpResponse) {
            lock(&self.script).push_back(Ok(response));
        }

        /// Queue a failed round trip.
        pub fn push_error(&self, error: Error) {
            lock(&self.script).push_back(Err(error));
        }

        /// Queue a response (builder style).
        #[must_use]
        pub fn with_response(self, response: HttpResponse) -> Self {
            self.push_response(response);
            self
        }

        /// Requests received so far, oldest first
        #[must_use]
        pub fn requests(&self) -> Vec<HttpRequest> {
            lock(&self.requests).clone()
        }

        /// Number of round trips attempted
        #[must_use]
        pub fn call_count(&self) -> usize {
            lock(&self.requests).len()
        }

        /// Scripted outcomes not yet consumed
        #[must_use]
        pub fn remaining(&self) -> usize {
            lock(&self.script).len()
        }
    }

    impl Transport for MockTransport {
        fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
            lock(&self.requests).push(request.clone());
            lock(&self.script)
                .pop_front()
                .unwrap_or_else(|| Err(Error::Transport("no scripted response left".to_string())))
        }
    }

    /// Records the name of every phase a request runs.
    #[derive(Debug, Clone, Default)]
    pub struct PhaseRecorder {
        phases: Arc<Mutex<Vec<Phase>>>,
    }

    impl PhaseRecorder {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Put a recording step at the front of every phase.
        pub fn install(&self, handlers: &mut Handlers) {
            for phase in Phase::ALL {
                let phases = Arc::clone(&self.phases);
                handlers
                    .phase_mut(phase)
                    .push_front(format!("record.{phase}"), move |_| lock(&phases).push(phase));
            }
        }

        /// Phases run so far, in order
        #[must_use]
        pub fn phases(&self) -> Vec<Phase> {
            lock(&self.phases).clone()
        }

        /// Forget everything recorded so far.
        pub fn clear(&self) {
            lock(&self.phases).clear();
        }
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Filtering follows `RUST_LOG`. Calling it again is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, MockTransport, PhaseRecorder, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use reqchain_core::{Error, Handlers, HttpRequest, HttpResponse, Phase};
    use reqchain_runtime::Transport;

    fn http_request() -> HttpRequest {
        HttpRequest::new("GET", "https://example.com/".parse().unwrap())
    }

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_mock_transport_replays_script_in_order() {
        let transport = MockTransport::new().with_response(HttpResponse::new(500, ""));
        transport.push_error(Error::Transport("reset".into()));

        assert_eq!(transport.round_trip(&http_request()).unwrap().status, 500);
        assert_eq!(
            transport.round_trip(&http_request()),
            Err(Error::Transport("reset".into()))
        );
        assert!(matches!(
            transport.round_trip(&http_request()),
            Err(Error::Transport(_))
        ));
        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.remaining(), 0);
    }

    #[test]
    fn test_phase_recorder_installs_first() {
        let recorder = PhaseRecorder::new();
        let mut handlers = Handlers::new();
        handlers.build.push_back("existing", |_| {});
        recorder.install(&mut handlers);

        assert_eq!(handlers.build.names(), ["record.Build", "existing"]);
        assert!(recorder.phases().is_empty());
        assert_eq!(Phase::ALL.len(), 10);
    }
}
