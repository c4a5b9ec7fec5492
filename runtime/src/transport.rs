//! The HTTP exchange behind the Send phase.
//!
//! # Example
//!
//! ```rust,no_run
//! use reqchain_runtime::transport::{ReqwestTransport, send_handler};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn example(service: &mut reqchain_core::Service) -> Result<(), reqchain_core::Error> {
//! let transport = Arc::new(ReqwestTransport::with_timeout(Duration::from_secs(30))?);
//! service.handlers.send.push_back_named(send_handler(transport));
//! # Ok(())
//! # }
//! ```

use reqchain_core::{Error, Headers, HttpRequest, HttpResponse, NamedHandler, Request};
use std::sync::Arc;
use std::time::Duration;

/// Name of the Send phase step installed by [`send_handler`]
pub const SEND_HANDLER: &str = "reqchain.Send";

/// Performs one request/response exchange.
///
/// Implementations block until the response body has been read. Timeouts
/// and cancellation belong to the implementation.
pub trait Transport: Send + Sync {
    /// Exchange `request` for a response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when no response was received.
    fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

/// Blocking HTTP transport backed by `reqwest`.
///
/// Must not be created or dropped inside an async runtime; wrap such use in
/// `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Create a transport with reqwest's default settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the TLS backend fails to initialize.
    pub fn new() -> Result<Self, Error> {
        Self::from_builder(reqwest::blocking::Client::builder())
    }

    /// Create a transport that abandons exchanges after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the TLS backend fails to initialize.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        Self::from_builder(reqwest::blocking::Client::builder().timeout(timeout))
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }

    fn from_builder(builder: reqwest::blocking::ClientBuilder) -> Result<Self, Error> {
        let client = builder
            .build()
            .map_err(|e| Error::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::Build(format!("invalid HTTP method `{}`: {e}", request.method)))?;

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body.clone())
            .send()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .map_err(|e| Error::Transport(format!("failed to read response body: {e}")))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Send phase step: exchanges `request.http_request` through `transport`.
///
/// Stores the response in `request.http_response`, or the transport error in
/// `request.error`. Transport errors end [`Request::send`] without a retry.
#[must_use]
pub fn send_handler(transport: Arc<dyn Transport>) -> NamedHandler {
    NamedHandler::new(SEND_HANDLER, move |request: &mut Request| {
        request.http_response = None;
        match transport.round_trip(&request.http_request) {
            Ok(response) => {
                tracing::debug!(
                    operation = %request.operation.name,
                    status = response.status,
                    "Received response"
                );
                request.http_response = Some(response);
            }
            Err(error) => {
                tracing::warn!(
                    operation = %request.operation.name,
                    error = %error,
                    "Transport failed"
                );
                request.error = Some(error);
            }
        }
    })
}
