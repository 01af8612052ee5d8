//! Configuration for talking to the extraction service.
//!
//! Everything the HTTP adapter needs lives in [`ServiceConfig`], built via
//! its [`ServiceConfigBuilder`]. The per-submission choices (provider,
//! models, credential) are *not* here: they are session state and live in
//! [`crate::session::Configuration`].

use crate::catalog::Provider;
use crate::error::WorkbenchError;
use serde::{Deserialize, Serialize};

/// Default service location: the bundled backend on localhost.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Connection settings for the extraction service.
///
/// # Example
/// ```rust
/// use pdfparse_workbench::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .base_url("https://parse.example.com")
///     .request_timeout_secs(600)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "https://parse.example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Scheme + host (+ optional path prefix), without trailing slash.
    /// Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Whole-request timeout in seconds. Default: 300.
    ///
    /// The service calls an LLM for every layout-dependent page, so a long
    /// document legitimately takes minutes.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 300,
            connect_timeout_secs: 10,
            user_agent: concat!("pdfparse-workbench/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// `{base_url}/api/{provider}/parse`
    pub fn parse_url(&self, provider: Provider) -> String {
        format!("{}/api/{}/parse", self.base_url, provider.as_str())
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, WorkbenchError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(WorkbenchError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(WorkbenchError::InvalidConfig(
                "request timeout must be ≥ 1s".into(),
            ));
        }
        if c.connect_timeout_secs == 0 {
            return Err(WorkbenchError::InvalidConfig(
                "connect timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}
