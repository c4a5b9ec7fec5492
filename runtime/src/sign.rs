//! Bearer-token signing for the Sign phase.
//!
//! Ordinary requests carry the token in headers:
//!
//! ```text
//! authorization: Bearer <token>
//! x-reqchain-date: 20240101T000000Z
//! ```
//!
//! A presigned request (non-zero `expire_time`) puts the same information in
//! the URL query instead, so the URL alone authorizes the call until it
//! expires: `X-Reqchain-Token`, `X-Reqchain-Date`, `X-Reqchain-Expires`.

use reqchain_core::{Error, NamedHandler, Request};

/// Name of the Sign step installed by [`TokenSigner::handler`]
pub const SIGN_HANDLER: &str = "reqchain.TokenSign";

/// Header carrying the signing timestamp
pub const DATE_HEADER: &str = "x-reqchain-date";

/// Query parameter carrying the token on presigned URLs
pub const TOKEN_QUERY: &str = "X-Reqchain-Token";
/// Query parameter carrying the signing timestamp on presigned URLs
pub const DATE_QUERY: &str = "X-Reqchain-Date";
/// Query parameter carrying the validity in seconds on presigned URLs
pub const EXPIRES_QUERY: &str = "X-Reqchain-Expires";

const DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Signs requests with a static bearer token.
#[derive(Clone)]
pub struct TokenSigner {
    token: String,
}

impl TokenSigner {
    /// Create a signer for the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Sign step: an empty token fails with [`Error::Sign`].
    #[must_use]
    pub fn handler(&self) -> NamedHandler {
        let token = self.token.clone();
        NamedHandler::new(SIGN_HANDLER, move |request: &mut Request| {
            if request.error.is_some() {
                return;
            }
            if token.trim().is_empty() {
                request.error = Some(Error::Sign("no token configured".to_string()));
                return;
            }

            let date = request.time.format(DATE_FORMAT).to_string();
            if request.expire_time.is_zero() {
                request
                    .http_request
                    .set_header("authorization", format!("Bearer {token}"));
                request.http_request.set_header(DATE_HEADER, date);
                return;
            }

            let expires = request.expire_time.as_secs().to_string();
            request
                .http_request
                .url
                .query_pairs_mut()
                .append_pair(TOKEN_QUERY, &token)
                .append_pair(DATE_QUERY, &date)
                .append_pair(EXPIRES_QUERY, &expires);
            tracing::debug!(
                operation = %request.operation.name,
                expires_secs = request.expire_time.as_secs(),
                "Presigned request"
            );
        })
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reqchain_core::{Config, Operation, Service};
    use std::sync::Arc;
    use std::time::Duration;

    fn request() -> Request {
        let service = Service::new(Config::builder().endpoint("https://example.com").build()).unwrap();
        let mut request = Arc::new(service).new_request(
            Arc::new(Operation::new("GetObject").with_method("GET").with_path("/objects/a")),
            serde_json::Value::Null,
            serde_json::Value::Null,
        );
        request.time = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        request
    }

    #[test]
    fn test_signs_headers() {
        let mut request = request();
        (TokenSigner::new("secret").handler().func)(&mut request);

        assert!(request.error.is_none());
        assert_eq!(request.http_request.header("Authorization"), Some("Bearer secret"));
        assert_eq!(request.http_request.header(DATE_HEADER), Some("20240301T123000Z"));
        assert!(request.http_request.url.query().is_none());
    }

    #[test]
    fn test_presigned_request_uses_query() {
        let mut request = request();
        request.expire_time = Duration::from_secs(300);
        (TokenSigner::new("secret").handler().func)(&mut request);

        assert_eq!(
            request.http_request.url.as_str(),
            "https://example.com/objects/a?X-Reqchain-Token=secret&X-Reqchain-Date=20240301T123000Z&X-Reqchain-Expires=300"
        );
        assert!(request.http_request.header("authorization").is_none());
    }

    #[test]
    fn test_empty_token_is_a_sign_error() {
        let mut request = request();
        (TokenSigner::new(" ").handler().func)(&mut request);
        assert!(matches!(request.error, Some(Error::Sign(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", TokenSigner::new("secret"));
        assert!(!rendered.contains("secret"));
    }
}
