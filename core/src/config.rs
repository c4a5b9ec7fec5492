//! Client configuration.
//!
//! # Example
//!
//! ```
//! use reqchain_core::config::Config;
//!
//! let config = Config::builder()
//!     .endpoint("https://api.example.com")
//!     .service_name("example")
//!     .max_retries(5)
//!     .build();
//!
//! assert_eq!(config.max_retries, 5);
//! ```

use crate::error::ConfigError;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Environment variable holding the endpoint
pub const ENV_ENDPOINT: &str = "REQCHAIN_ENDPOINT";
/// Environment variable holding the service name
pub const ENV_SERVICE: &str = "REQCHAIN_SERVICE";
/// Environment variable holding the API version
pub const ENV_API_VERSION: &str = "REQCHAIN_API_VERSION";
/// Environment variable holding the retry limit
pub const ENV_MAX_RETRIES: &str = "REQCHAIN_MAX_RETRIES";

/// Settings shared by every request of a service.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `user_agent`: `reqchain/<crate version>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL that operation paths are appended to
    pub endpoint: String,
    /// Service name, used for signing and metrics labels
    pub service_name: String,
    /// API version, if the protocol sends one
    pub api_version: Option<String>,
    /// Target prefix for JSON-RPC style protocols (`X-Amz-Target`)
    pub target_prefix: Option<String>,
    /// Maximum retries after the first attempt
    pub max_retries: u32,
    /// Value of the `User-Agent` header
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            service_name: String::new(),
            api_version: None,
            target_prefix: None,
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("reqchain/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from `REQCHAIN_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEndpoint`] if `REQCHAIN_ENDPOINT` is not
    /// set, or [`ConfigError::InvalidValue`] if `REQCHAIN_MAX_RETRIES` is not
    /// a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENV_ENDPOINT)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;

        let mut builder = Self::builder().endpoint(endpoint);
        if let Some(service) = lookup(ENV_SERVICE) {
            builder = builder.service_name(service);
        }
        if let Some(version) = lookup(ENV_API_VERSION) {
            builder = builder.api_version(version);
        }
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            let retries = raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_MAX_RETRIES,
                    value: raw.clone(),
                })?;
            builder = builder.max_retries(retries);
        }

        Ok(builder.build())
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    endpoint: Option<String>,
    service_name: Option<String>,
    api_version: Option<String>,
    target_prefix: Option<String>,
    max_retries: Option<u32>,
    user_agent: Option<String>,
}

impl ConfigBuilder {
    /// Set the endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the service name.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the API version.
    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set the JSON-RPC target prefix.
    #[must_use]
    pub fn target_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.target_prefix = Some(prefix.into());
        self
    }

    /// Set the maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the `User-Agent` header value.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the [`Config`].
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            endpoint: self.endpoint.unwrap_or_default(),
            service_name: self.service_name.unwrap_or_default(),
            api_version: self.api_version,
            target_prefix: self.target_prefix,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
        }
    }
}
