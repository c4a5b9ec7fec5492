//! A configured API endpoint and the handler registry its requests start from.

use crate::config::Config;
use crate::environment::{Clock, SystemClock};
use crate::error::ConfigError;
use crate::handlers::Handlers;
use crate::operation::Operation;
use crate::payload::Payload;
use crate::request::Request;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// One API endpoint plus the steps every request against it runs.
///
/// Install handlers while the service is still owned, then share it behind
/// an `Arc`; requests copy [`Service::handlers`] when they are created.
pub struct Service {
    /// Configuration this service was created from
    pub config: Config,
    /// Registry copied into every new request
    pub handlers: Handlers,
    endpoint: Url,
    clock: Arc<dyn Clock>,
}

impl Service {
    /// Create a service for `config.endpoint` with an empty handler registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEndpoint`] if the endpoint is empty, or
    /// [`ConfigError::InvalidEndpoint`] if it is not an absolute URL with a
    /// path that operation paths can be appended to.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let raw = config.endpoint.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }

        let endpoint = Url::parse(raw).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: e.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: raw.to_string(),
                reason: "URL cannot carry a path".to_string(),
            });
        }

        tracing::debug!(endpoint = %endpoint, service = %config.service_name, "Service created");

        Ok(Self {
            config,
            handlers: Handlers::new(),
            endpoint,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used to stamp new requests (builder style).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Parsed endpoint
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Clock used to stamp new requests
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// URL for an operation path template.
    ///
    /// The template is appended to the endpoint's own path. A `?query`
    /// suffix in the template becomes the URL query.
    #[must_use]
    pub fn url_for(&self, path: &str) -> Url {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path, None),
        };

        let mut url = self.endpoint.clone();
        let base = url.path().trim_end_matches('/').to_string();
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        url.set_path(&joined);
        if let Some(query) = query.filter(|query| !query.is_empty()) {
            url.set_query(Some(query));
        }
        url
    }

    /// Create a request for `operation` with typed params and data target.
    pub fn new_request<P, D>(self: &Arc<Self>, operation: Arc<Operation>, params: P, data: D) -> Request
    where
        P: Payload,
        D: Payload,
    {
        Request::new(Arc::clone(self), operation, Box::new(params), Box::new(data))
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("endpoint", &self.endpoint.as_str())
            .field("config", &self.config)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}
