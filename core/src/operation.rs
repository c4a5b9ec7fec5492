//! Static descriptors of API operations.

/// Default HTTP method when an operation does not name one
pub const DEFAULT_METHOD: &str = "POST";

/// Default HTTP path when an operation does not name one
pub const DEFAULT_PATH: &str = "/";

/// Token paths that make an operation paginated.
///
/// Each field is a path expression: `input_token` into Params, the others
/// into Data (except `limit_token`, which also addresses Params).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paginator {
    /// Where the next token is written in the next request's Params
    pub input_token: String,
    /// Where the next token is read from the response Data
    pub output_token: String,
    /// Where the page size lives in Params
    pub limit_token: String,
    /// Where a "more results" flag lives in Data; empty if not used
    pub truncation_token: String,
}

impl Paginator {
    /// Paginator with input and output token paths.
    #[must_use]
    pub fn new(input_token: impl Into<String>, output_token: impl Into<String>) -> Self {
        Self {
            input_token: input_token.into(),
            output_token: output_token.into(),
            ..Self::default()
        }
    }

    /// Set the page-size path (builder style).
    #[must_use]
    pub fn with_limit_token(mut self, path: impl Into<String>) -> Self {
        self.limit_token = path.into();
        self
    }

    /// Set the truncation-flag path (builder style).
    #[must_use]
    pub fn with_truncation_token(mut self, path: impl Into<String>) -> Self {
        self.truncation_token = path.into();
        self
    }
}

/// Immutable descriptor of one API call shape.
///
/// # Example
///
/// ```
/// use reqchain_core::operation::{Operation, Paginator};
///
/// let op = Operation::new("ListUsers")
///     .with_method("GET")
///     .with_path("/users")
///     .with_paginator(Paginator::new("Marker", "NextMarker").with_truncation_token("IsTruncated"));
///
/// assert_eq!(op.method(), "GET");
/// assert!(op.paginator.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    /// Operation name, e.g. `ListUsers`
    pub name: String,
    /// HTTP method; empty means [`DEFAULT_METHOD`]
    pub http_method: String,
    /// HTTP path template; empty means [`DEFAULT_PATH`]
    pub http_path: String,
    /// Pagination descriptor; `None` means not paginated
    pub paginator: Option<Paginator>,
}

impl Operation {
    /// Operation with default method and path.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the HTTP method (builder style).
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.http_method = method.into();
        self
    }

    /// Set the HTTP path template (builder style).
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.http_path = path.into();
        self
    }

    /// Attach a pagination descriptor (builder style).
    #[must_use]
    pub fn with_paginator(mut self, paginator: Paginator) -> Self {
        self.paginator = Some(paginator);
        self
    }

    /// Effective HTTP method
    #[must_use]
    pub fn method(&self) -> &str {
        if self.http_method.is_empty() {
            DEFAULT_METHOD
        } else {
            &self.http_method
        }
    }

    /// Effective HTTP path
    #[must_use]
    pub fn path(&self) -> &str {
        if self.http_path.is_empty() {
            DEFAULT_PATH
        } else {
            &self.http_path
        }
    }
}
