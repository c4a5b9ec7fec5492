//! The standard phase steps, assembled onto a [`Service`].
//!
//! ```text
//! Validate          reqchain.ValidateParams
//! Build             reqchain.UserAgent, reqchain.json.Build
//! Sign              reqchain.TokenSign            (with a signer)
//! Send              reqchain.Send
//! UnmarshalMeta     reqchain.RequestId
//! ValidateResponse  reqchain.ValidateResponse
//! Retry             reqchain.Retry
//! AfterRetry        reqchain.AfterRetry
//! Unmarshal         reqchain.json.Unmarshal
//! UnmarshalError    reqchain.json.UnmarshalError
//! ```
//!
//! With metrics enabled the [`RequestMetrics`] steps are added around these.

use crate::metrics::RequestMetrics;
use crate::protocol;
use crate::response::{request_id_handler, validate_response_handler};
use crate::retry::RetryPolicy;
use crate::sign::TokenSigner;
use crate::transport::{Transport, send_handler};
use crate::user_agent::user_agent_handler;
use crate::validate::validate_params_handler;
use reqchain_core::{Handlers, Service};
use std::sync::Arc;

/// Builder for the standard handler set.
#[must_use]
pub struct DefaultHandlers {
    transport: Arc<dyn Transport>,
    retry_policy: Option<RetryPolicy>,
    signer: Option<TokenSigner>,
    metrics: bool,
}

impl DefaultHandlers {
    /// Standard steps sending through `transport`.
    ///
    /// Without [`with_retry_policy`](Self::with_retry_policy) the policy is the
    /// default one with `max_retries` taken from the service config.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry_policy: None,
            signer: None,
            metrics: false,
        }
    }

    /// Use an explicit retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sign requests with a bearer token.
    pub fn with_signer(mut self, signer: TokenSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Record [`RequestMetrics`].
    pub const fn with_metrics(mut self) -> Self {
        self.metrics = true;
        self
    }

    /// Append the steps to `handlers`, using `max_retries` when no policy was given.
    pub fn install_into(self, handlers: &mut Handlers, max_retries: u32) {
        handlers.validate.push_back_named(validate_params_handler());
        handlers.build.push_back_named(user_agent_handler());
        if let Some(signer) = &self.signer {
            handlers.sign.push_back_named(signer.handler());
        }
        handlers.send.push_back_named(send_handler(self.transport));
        handlers.unmarshal_meta.push_back_named(request_id_handler());
        handlers
            .validate_response
            .push_back_named(validate_response_handler());
        protocol::install_json(handlers);

        let policy = self
            .retry_policy
            .unwrap_or_else(|| RetryPolicy::builder().max_retries(max_retries).build());
        policy.install(handlers);

        if self.metrics {
            RequestMetrics::install(handlers);
        }
    }

    /// Append the steps to the service's registry.
    pub fn install(self, service: &mut Service) {
        let max_retries = service.config.max_retries;
        tracing::debug!(service = %service.config.service_name, max_retries, "Installing default handlers");
        self.install_into(&mut service.handlers, max_retries);
    }
}

impl std::fmt::Debug for DefaultHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHandlers")
            .field("retry_policy", &self.retry_policy)
            .field("signer", &self.signer)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}
