//! # reqchain runtime
//!
//! The collaborators that plug into the phases of a
//! [`reqchain_core::Request`]: an HTTP transport, the JSON wire protocol,
//! response checks, a bounded retry policy, parameter validation, signing and
//! metrics.
//!
//! Everything here is an ordinary [`NamedHandler`](reqchain_core::NamedHandler);
//! the core lifecycle knows nothing about HTTP status codes, JSON or backoff.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reqchain_core::{Config, Operation, Service};
//! use reqchain_runtime::{DefaultHandlers, ReqwestTransport, TokenSigner};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut service = Service::new(Config::from_env()?)?;
//! DefaultHandlers::new(Arc::new(ReqwestTransport::new()?))
//!     .with_signer(TokenSigner::new("token"))
//!     .install(&mut service);
//!
//! let service = Arc::new(service);
//! let operation = Arc::new(Operation::new("ListTables"));
//! let mut request = service.new_request(operation, serde_json::json!({}), serde_json::Value::Null);
//! request.send()?;
//! # Ok(())
//! # }
//! ```

/// Standard handler set
pub mod defaults;

/// Prometheus metrics for observability
pub mod metrics;

/// Wire protocols
pub mod protocol;

/// Response status and metadata checks
pub mod response;

/// Retry logic with exponential backoff
pub mod retry;

/// Request signing
pub mod sign;

/// HTTP transport
pub mod transport;

pub mod user_agent;

/// Required-parameter validation
pub mod validate;

pub use defaults::DefaultHandlers;
pub use crate::metrics::{MetricsError, MetricsExporter, RequestMetrics, RetryMetrics};
pub use retry::{RetryPolicy, RetryPolicyBuilder};
pub use sign::TokenSigner;
pub use transport::{ReqwestTransport, Transport, send_handler};
pub use validate::missing_required_fields;
