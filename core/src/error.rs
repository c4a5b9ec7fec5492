//! Error types for the request lifecycle

use thiserror::Error;

/// Failure recorded on a [`Request`](crate::request::Request) by one of its phases.
///
/// Phases communicate failure only by storing one of these in
/// `Request::error`; the lifecycle methods hand a clone back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Input parameters failed preconditions before any network activity
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The outgoing message could not be assembled
    #[error("Failed to build request: {0}")]
    Build(String),

    /// The outgoing message could not be signed
    #[error("Failed to sign request: {0}")]
    Sign(String),

    /// Network or I/O failure while exchanging the message
    #[error("Transport failed: {0}")]
    Transport(String),

    /// The endpoint answered with a failing response
    #[error("{code} (status {status}): {message}")]
    Response {
        /// HTTP status code
        status: u16,
        /// Service error code, e.g. `ThrottlingException`
        code: String,
        /// Error message from the service
        message: String,
        /// Request identifier reported by the service, if any
        request_id: Option<String>,
    },

    /// The response body could not be decoded
    #[error("Failed to unmarshal response: {0}")]
    Unmarshal(String),
}

const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "SlowDown",
];

impl Error {
    /// Build a response error from a status code alone.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self::Response {
            status,
            code: format!("HTTP {status}"),
            message: String::new(),
            request_id: None,
        }
    }

    /// HTTP status for response errors
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Service error code for response errors
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Response { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether a retry policy may try the exchange again.
    ///
    /// Server errors (5xx), 429 and throttling codes are retryable. Nothing
    /// else is, including transport failures.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Response { status, code, .. } => {
                *status >= 500 || *status == 429 || THROTTLING_CODES.contains(&code.as_str())
            }
            _ => false,
        }
    }
}

/// Problems with client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No endpoint was configured
    #[error("Missing endpoint (set REQCHAIN_ENDPOINT or Config::builder().endpoint(..))")]
    MissingEndpoint,

    /// The endpoint is not an absolute URL that paths can be appended to
    #[error("Invalid endpoint `{endpoint}`: {reason}")]
    InvalidEndpoint {
        /// The configured endpoint
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },

    /// An environment variable holds an unusable value
    #[error("Invalid value `{value}` for {key}")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}
