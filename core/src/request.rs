//! Execution context of one API call.
//!
//! A [`Request`] is driven through its phases by [`Request::build`],
//! [`Request::sign`] and [`Request::send`]. Phases report failure only by
//! storing an [`Error`] in `request.error`; each lifecycle method checks it
//! after every phase and stops early.
//!
//! ```text
//! new ──► Validate ──► Build ──► Sign ──► Send ──► UnmarshalMeta ──► ValidateResponse
//!                                          ▲                            │ ok      │ error
//!                                          │                       Unmarshal   Retry
//!                                          │                            │     AfterRetry
//!                                          └──── error cleared ─────────┼────────┤
//!                                                                       ▼        ▼ error kept
//!                                                                     done  UnmarshalError
//! ```
//!
//! The Send loop has no attempt limit of its own. It stops retrying only when
//! the Retry and AfterRetry steps leave the error in place, so the installed
//! retry policy must bound the number of attempts.

use crate::error::Error;
use crate::handlers::{Handlers, Phase};
use crate::http::{HttpRequest, HttpResponse};
use crate::operation::Operation;
use crate::payload::Payload;
use crate::service::Service;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Mutable, single-use context for one logical API call.
#[derive(Debug)]
pub struct Request {
    /// Service this request was created from
    pub service: Arc<Service>,
    /// Private copy of the service's handler registry
    pub handlers: Handlers,
    /// Creation time, from the service clock
    pub time: DateTime<Utc>,
    /// Validity of a presigned URL; zero for ordinary requests
    pub expire_time: Duration,
    /// Operation being called
    pub operation: Arc<Operation>,
    /// Outgoing message
    pub http_request: HttpRequest,
    /// Incoming message, once the Send phase received one
    pub http_response: Option<HttpResponse>,
    /// Input parameters
    pub params: Box<dyn Payload>,
    /// First unresolved failure; `None` while everything succeeded
    pub error: Option<Error>,
    /// Output target, populated by the Unmarshal phase
    pub data: Box<dyn Payload>,
    /// Request identifier reported by the service
    pub request_id: Option<String>,
    /// Attempts retried so far
    pub retry_count: u32,
    built: bool,
}

impl Request {
    /// Create a request with a fresh copy of the service's handlers.
    ///
    /// The outgoing message targets the service endpoint joined with the
    /// operation path, using the operation's method, with an empty body.
    #[must_use]
    pub fn new(
        service: Arc<Service>,
        operation: Arc<Operation>,
        params: Box<dyn Payload>,
        data: Box<dyn Payload>,
    ) -> Self {
        let url = service.url_for(operation.path());
        let http_request = HttpRequest::new(operation.method(), url);
        let handlers = service.handlers.clone();
        let time = service.clock().now();

        Self {
            service,
            handlers,
            time,
            expire_time: Duration::ZERO,
            operation,
            http_request,
            http_response: None,
            params,
            error: None,
            data,
            request_id: None,
            retry_count: 0,
            built: false,
        }
    }

    /// Replace the outgoing body.
    pub fn set_buffer_body(&mut self, body: impl Into<Vec<u8>>) {
        self.http_request.body = body.into();
    }

    /// Returns true once the Build phase has been attempted
    #[must_use]
    pub const fn is_built(&self) -> bool {
        self.built
    }

    /// Run every step of `phase` against this request.
    ///
    /// The phase's list is copied first, so steps may edit
    /// `request.handlers` without affecting the run in progress.
    pub fn run_phase(&mut self, phase: Phase) {
        let list = self.handlers.phase(phase).clone();
        if list.is_empty() {
            return;
        }
        let span = tracing::debug_span!("phase", phase = %phase, operation = %self.operation.name);
        let _guard = span.enter();
        list.run(self);
    }

    fn outcome(&self) -> Result<(), Error> {
        self.error.clone().map_or(Ok(()), Err)
    }

    /// Validate the params and assemble the outgoing message.
    ///
    /// Runs only once: later calls return the stored outcome. A failed
    /// Validate phase does not count as an attempt, so the next call
    /// validates again.
    ///
    /// # Errors
    ///
    /// Returns the error recorded by the Validate or Build phase.
    pub fn build(&mut self) -> Result<(), Error> {
        if self.built {
            return self.outcome();
        }

        self.error = None;
        self.run_phase(Phase::Validate);
        if self.error.is_some() {
            return self.outcome();
        }

        self.run_phase(Phase::Build);
        self.built = true;
        self.outcome()
    }

    /// Build, then sign the outgoing message.
    ///
    /// # Errors
    ///
    /// Returns the build error, or the error recorded by the Sign phase.
    pub fn sign(&mut self) -> Result<(), Error> {
        self.build()?;
        self.run_phase(Phase::Sign);
        self.outcome()
    }

    /// Sign, then exchange the message until it succeeds or fails for good.
    ///
    /// A transport failure in the Send phase ends the call at once. A
    /// response rejected by ValidateResponse goes through Retry and
    /// AfterRetry; if they clear the error the exchange repeats, otherwise
    /// UnmarshalError decodes the failure and it is returned.
    ///
    /// # Errors
    ///
    /// Returns the first terminal error of any phase.
    pub fn send(&mut self) -> Result<(), Error> {
        self.sign()?;

        loop {
            tracing::debug!(
                operation = %self.operation.name,
                attempt = self.retry_count + 1,
                "Sending request"
            );

            self.run_phase(Phase::Send);
            if self.error.is_some() {
                return self.outcome();
            }

            self.run_phase(Phase::UnmarshalMeta);
            self.run_phase(Phase::ValidateResponse);
            if self.error.is_none() {
                self.run_phase(Phase::Unmarshal);
                return self.outcome();
            }

            self.run_phase(Phase::Retry);
            self.run_phase(Phase::AfterRetry);
            if self.error.is_some() {
                self.run_phase(Phase::UnmarshalError);
                return self.outcome();
            }

            tracing::debug!(
                operation = %self.operation.name,
                retry_count = self.retry_count,
                "Retrying request"
            );
        }
    }

    /// Sign the request for deferred use and return its URL.
    ///
    /// # Errors
    ///
    /// Returns the build or sign error; no URL is produced then.
    pub fn presign(&mut self, expire: Duration) -> Result<String, Error> {
        self.expire_time = expire;
        self.sign()?;
        Ok(self.http_request.url.to_string())
    }

    /// Params as their concrete type
    #[must_use]
    pub fn params_as<T: Payload>(&self) -> Option<&T> {
        self.params.as_reflect().as_any().downcast_ref::<T>()
    }

    /// Mutable params as their concrete type
    pub fn params_as_mut<T: Payload>(&mut self) -> Option<&mut T> {
        self.params.as_reflect_mut().as_any_mut().downcast_mut::<T>()
    }

    /// Data as its concrete type
    #[must_use]
    pub fn data_as<T: Payload>(&self) -> Option<&T> {
        self.data.as_reflect().as_any().downcast_ref::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_support::{ListInput, ListOutput, list_operation, list_request, test_service};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn recording_service(log: &Arc<Mutex<Vec<Phase>>>) -> Arc<Service> {
        let mut service = Service::new(Config::builder().endpoint("https://example.com").build()).unwrap();
        for phase in Phase::ALL {
            let log = Arc::clone(log);
            service
                .handlers
                .phase_mut(phase)
                .push_back("record", move |_| log.lock().unwrap().push(phase));
        }
        Arc::new(service)
    }

    #[test]
    fn test_new_derives_outgoing_message() {
        let request = list_request(&test_service());
        assert_eq!(request.http_request.method, "GET");
        assert_eq!(request.http_request.url.as_str(), "https://example.com/items");
        assert!(request.http_request.body.is_empty());
        assert_eq!(request.retry_count, 0);
        assert!(!request.is_built());
    }

    #[test]
    fn test_successful_send_runs_phases_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let service = recording_service(&log);
        let mut request = service.new_request(
            Arc::new(list_operation()),
            ListInput::default(),
            ListOutput::default(),
        );

        request.send().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            [
                Phase::Validate,
                Phase::Build,
                Phase::Sign,
                Phase::Send,
                Phase::UnmarshalMeta,
                Phase::ValidateResponse,
                Phase::Unmarshal,
            ]
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let count = Arc::new(AtomicU32::new(0));
        let mut request = list_request(&test_service());
        let counter = Arc::clone(&count);
        request.handlers.build.push_back("count", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        request.build().unwrap();
        request.build().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(request.is_built());
    }

    #[test]
    fn test_build_stops_after_failed_validation() {
        let mut request = list_request(&test_service());
        request
            .handlers
            .validate
            .push_back("reject", |r| r.error = Some(Error::Validation("missing Prefix".into())));
        request
            .handlers
            .build
            .push_back("mark", |r| r.http_request.set_header("x-built", "yes"));

        let result = request.build();

        assert_eq!(result, Err(Error::Validation("missing Prefix".into())));
        assert!(request.http_request.header("x-built").is_none());
        assert!(!request.is_built());
    }

    #[test]
    fn test_build_revalidates_after_failed_validation() {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut request = list_request(&test_service());
        request.error = Some(Error::Transport("stale".into()));
        let counter = Arc::clone(&attempts);
        request.handlers.validate.push_back("reject-once", move |r| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                r.error = Some(Error::Validation("missing Prefix".into()));
            }
        });
        request
            .handlers
            .build
            .push_back("mark", |r| r.http_request.set_header("x-built", "yes"));

        assert_eq!(
            request.build(),
            Err(Error::Validation("missing Prefix".into()))
        );
        assert!(!request.is_built());

        assert_eq!(request.build(), Ok(()));
        assert!(request.error.is_none());
        assert!(request.is_built());
        assert_eq!(request.http_request.header("x-built"), Some("yes"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_build_error_is_sticky() {
        let mut request = list_request(&test_service());
        request
            .handlers
            .build
            .push_back("fail", |r| r.error = Some(Error::Build("bad body".into())));

        assert!(request.build().is_err());
        assert!(request.is_built());
        assert_eq!(request.build(), Err(Error::Build("bad body".into())));
    }

    #[test]
    fn test_sign_error_skips_send() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let service = recording_service(&log);
        let mut request = service.new_request(
            Arc::new(list_operation()),
            ListInput::default(),
            ListOutput::default(),
        );
        request
            .handlers
            .sign
            .push_back("fail", |r| r.error = Some(Error::Sign("no credentials".into())));

        assert_eq!(request.send(), Err(Error::Sign("no credentials".into())));
        assert!(!log.lock().unwrap().contains(&Phase::Send));
    }

    #[test]
    fn test_transport_error_is_not_retried() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let service = recording_service(&log);
        let mut request = service.new_request(
            Arc::new(list_operation()),
            ListInput::default(),
            ListOutput::default(),
        );
        request
            .handlers
            .send
            .push_back("fail", |r| r.error = Some(Error::Transport("connection reset".into())));

        assert_eq!(request.send(), Err(Error::Transport("connection reset".into())));
        let log = log.lock().unwrap();
        assert_eq!(log.last(), Some(&Phase::Send));
        assert!(!log.contains(&Phase::Retry));
    }

    #[test]
    fn test_retry_loop_is_bounded_by_policy() {
        const LIMIT: u32 = 3;
        let sends = Arc::new(AtomicU32::new(0));
        let mut request = list_request(&test_service());

        let counter = Arc::clone(&sends);
        request.handlers.send.push_back("count", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        request
            .handlers
            .validate_response
            .push_back("always-fail", |r| r.error = Some(Error::from_status(503)));
        request.handlers.retry.push_back("bounded", |r| {
            if r.retry_count < LIMIT {
                r.error = None;
            }
        });
        request.handlers.after_retry.push_back("count", |r| {
            if r.error.is_none() {
                r.retry_count += 1;
            }
        });
        request
            .handlers
            .unmarshal_error
            .push_back("decode", |r| r.request_id = Some("decoded".into()));

        let result = request.send();

        assert_eq!(result, Err(Error::from_status(503)));
        assert_eq!(sends.load(Ordering::SeqCst), LIMIT + 1);
        assert_eq!(request.retry_count, LIMIT);
        assert_eq!(request.request_id.as_deref(), Some("decoded"));
    }

    #[test]
    fn test_presign_returns_signed_url() {
        let mut request = list_request(&test_service());
        request.handlers.sign.push_back("query-sign", |r| {
            let expires = r.expire_time.as_secs().to_string();
            r.http_request
                .url
                .query_pairs_mut()
                .append_pair("Expires", &expires);
        });

        let url = request.presign(Duration::from_secs(900)).unwrap();

        assert_eq!(url, "https://example.com/items?Expires=900");
        assert_eq!(request.expire_time, Duration::from_secs(900));
    }

    #[test]
    fn test_presign_propagates_sign_error() {
        let mut request = list_request(&test_service());
        request
            .handlers
            .sign
            .push_back("fail", |r| r.error = Some(Error::Sign("expired".into())));
        assert_eq!(
            request.presign(Duration::from_secs(60)),
            Err(Error::Sign("expired".into()))
        );
    }

    #[test]
    fn test_request_handlers_are_private_copies() {
        let service = test_service();
        let mut first = list_request(&service);
        first.handlers.send.push_back("only-first", |_| {});
        let second = list_request(&service);
        assert!(second.handlers.send.is_empty());
        assert!(service.handlers.send.is_empty());
    }

    #[test]
    fn test_typed_access() {
        let mut request = list_request(&test_service());
        request.params_as_mut::<ListInput>().unwrap().prefix = "photos/".into();
        assert_eq!(request.params_as::<ListInput>().unwrap().prefix, "photos/");
        assert!(request.params_as::<ListOutput>().is_none());
        assert_eq!(request.data_as::<ListOutput>(), Some(&ListOutput::default()));
    }
}
