//! Ergonomic testing utilities for requests
//!
//! This module provides a fluent API for driving one request through its
//! lifecycle with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // RequestTest is the natural name

use reqchain_core::{Error, Operation, Payload, Request, Service};
use std::sync::Arc;
use std::time::Duration;

/// Type alias for outcome assertion functions
type OutcomeAssertion = Box<dyn FnOnce(&Result<(), Error>)>;

/// Type alias for request assertion functions
type RequestAssertion = Box<dyn FnOnce(&Request)>;

/// Lifecycle entry point exercised by a [`RequestTest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `Request::build`
    Build,
    /// `Request::sign`
    Sign,
    /// `Request::send`
    Send,
    /// `Request::presign` with the given validity
    Presign(Duration),
}

/// Fluent API for testing requests with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use reqchain_testing::RequestTest;
///
/// RequestTest::new(service)
///     .given_operation(Operation::new("ListItems"))
///     .given_params(ListInput::default())
///     .given_data(ListOutput::default())
///     .when_send()
///     .then_outcome(|outcome| assert!(outcome.is_ok()))
///     .then_request(|request| {
///         assert_eq!(request.retry_count, 0);
///     })
///     .run();
/// ```
pub struct RequestTest {
    service: Arc<Service>,
    operation: Option<Arc<Operation>>,
    params: Option<Box<dyn Payload>>,
    data: Option<Box<dyn Payload>>,
    step: Option<Step>,
    outcome_assertions: Vec<OutcomeAssertion>,
    request_assertions: Vec<RequestAssertion>,
}

impl RequestTest {
    /// Create a new request test against the given service
    #[must_use]
    pub const fn new(service: Arc<Service>) -> Self {
        Self {
            service,
            operation: None,
            params: None,
            data: None,
            step: None,
            outcome_assertions: Vec::new(),
            request_assertions: Vec::new(),
        }
    }

    /// Set the operation to call (Given)
    #[must_use]
    pub fn given_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(Arc::new(operation));
        self
    }

    /// Set the input parameters (Given)
    #[must_use]
    pub fn given_params<P: Payload>(mut self, params: P) -> Self {
        self.params = Some(Box::new(params));
        self
    }

    /// Set the output target (Given); defaults to a JSON `null`
    #[must_use]
    pub fn given_data<D: Payload>(mut self, data: D) -> Self {
        self.data = Some(Box::new(data));
        self
    }

    /// Run [`Request::build`] (When)
    #[must_use]
    pub const fn when_build(mut self) -> Self {
        self.step = Some(Step::Build);
        self
    }

    /// Run [`Request::sign`] (When)
    #[must_use]
    pub const fn when_sign(mut self) -> Self {
        self.step = Some(Step::Sign);
        self
    }

    /// Run [`Request::send`] (When)
    #[must_use]
    pub const fn when_send(mut self) -> Self {
        self.step = Some(Step::Send);
        self
    }

    /// Run [`Request::presign`] (When)
    #[must_use]
    pub const fn when_presign(mut self, expire: Duration) -> Self {
        self.step = Some(Step::Presign(expire));
        self
    }

    /// Add an assertion about the lifecycle result (Then)
    #[must_use]
    pub fn then_outcome<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Result<(), Error>) + 'static,
    {
        self.outcome_assertions.push(Box::new(assertion));
        self
    }

    /// Expect the lifecycle call to fail with exactly `expected` (Then)
    #[must_use]
    pub fn then_error(self, expected: Error) -> Self {
        self.then_outcome(move |outcome| assertions::assert_failed_with(outcome, &expected))
    }

    /// Add an assertion about the request afterwards (Then)
    #[must_use]
    pub fn then_request<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Request) + 'static,
    {
        self.request_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// Returns the request for further inspection.
    ///
    /// # Panics
    ///
    /// Panics if operation, params, or step is not set,
    /// or if any assertions fail.
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) -> Request {
        let operation = self
            .operation
            .expect("Operation must be set with given_operation()");
        let params = self.params.expect("Params must be set with given_params()");
        let data = self
            .data
            .unwrap_or_else(|| Box::new(serde_json::Value::Null));
        let step = self.step.expect("Step must be set with when_*()");

        let mut request = Request::new(self.service, operation, params, data);
        let outcome = match step {
            Step::Build => request.build(),
            Step::Sign => request.sign(),
            Step::Send => request.send(),
            Step::Presign(expire) => request.presign(expire).map(|_| ()),
        };

        // Run outcome assertions
        for assertion in self.outcome_assertions {
            assertion(&outcome);
        }

        // Run request assertions
        for assertion in self.request_assertions {
            assertion(&request);
        }

        request
    }
}

/// Helper assertions for lifecycle outcomes
pub mod assertions {
    use reqchain_core::{Error, Request};

    /// Assert that the lifecycle call succeeded
    ///
    /// # Panics
    ///
    /// Panics if the outcome is an error.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_succeeded(outcome: &Result<(), Error>) {
        assert!(outcome.is_ok(), "Expected success, but found {outcome:?}");
    }

    /// Assert that the lifecycle call failed with `expected`
    ///
    /// # Panics
    ///
    /// Panics if the outcome differs.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_failed_with(outcome: &Result<(), Error>, expected: &Error) {
        assert_eq!(
            outcome.as_ref().err(),
            Some(expected),
            "Expected failure {expected:?}, but found {outcome:?}"
        );
    }

    /// Assert the number of retries performed
    ///
    /// # Panics
    ///
    /// Panics if the retry count doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_retries(request: &Request, expected: u32) {
        assert_eq!(
            request.retry_count, expected,
            "Expected {} retries, but found {}",
            expected, request.retry_count
        );
    }

    /// Assert that the outgoing message carries a header
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or has another value.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_header(request: &Request, name: &str, expected: &str) {
        assert_eq!(
            request.http_request.header(name),
            Some(expected),
            "Unexpected value for header {name}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqchain_core::Config;
    use serde_json::json;

    fn service() -> Arc<Service> {
        let mut service = Service::new(Config::builder().endpoint("https://example.com").build()).unwrap();
        service.handlers.build.push_back("body", |request| {
            request.set_buffer_body(b"{}".to_vec());
        });
        service.handlers.sign.push_back("deny", |request| {
            if request.expire_time.is_zero() {
                request.error = Some(Error::Sign("no credentials".into()));
            }
        });
        Arc::new(service)
    }

    #[test]
    fn test_request_test_build() {
        RequestTest::new(service())
            .given_operation(Operation::new("Ping"))
            .given_params(json!({}))
            .when_build()
            .then_outcome(assertions::assert_succeeded)
            .then_request(|request| {
                assert!(request.is_built());
                assert_eq!(request.http_request.body, b"{}");
            })
            .run();
    }

    #[test]
    fn test_request_test_sign_error() {
        let request = RequestTest::new(service())
            .given_operation(Operation::new("Ping"))
            .given_params(json!({}))
            .when_sign()
            .then_error(Error::Sign("no credentials".into()))
            .run();
        assert_eq!(request.error, Some(Error::Sign("no credentials".into())));
    }

    #[test]
    fn test_request_test_presign() {
        RequestTest::new(service())
            .given_operation(Operation::new("Ping"))
            .given_params(json!({}))
            .when_presign(Duration::from_secs(60))
            .then_outcome(assertions::assert_succeeded)
            .then_request(|request| assertions::assert_retries(request, 0))
            .run();
    }
}
