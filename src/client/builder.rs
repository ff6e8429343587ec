use crate::client::core::DtcClient;
use crate::{Error, ErrorContext, Result};
use std::time::Duration;

/// Request timeout applied when neither the builder nor `DTC_HTTP_TIMEOUT_SECS` set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Immutable session settings shared by every call of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL with trailing slashes removed.
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Log response bodies (at debug level) in addition to request metadata.
    pub verbose: bool,
}

/// Builder for creating clients with custom configuration.
///
/// Every setting falls back to an environment variable when not set explicitly:
/// - `DTC_BASE_URL`
/// - `DTC_API_KEY`
/// - `DTC_HTTP_TIMEOUT_SECS` (default 30)
/// - `DTC_VERBOSE` (`1` or `true`)
#[derive(Debug, Default)]
pub struct DtcClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
    verbose: Option<bool>,
}

impl DtcClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verbose(mut self, enable: bool) -> Self {
        self.verbose = Some(enable);
        self
    }

    /// Resolve explicit settings and environment fallbacks into a [`ClientConfig`].
    pub fn build_config(self) -> Result<ClientConfig> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("DTC_BASE_URL").ok())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "Base URL must be specified",
                    ErrorContext::new()
                        .with_field_path("base_url")
                        .with_details("set it on the builder or via DTC_BASE_URL"),
                )
            })?;
        let base_url = normalize_base_url(&base_url)?;

        let api_key = self
            .api_key
            .or_else(|| std::env::var("DTC_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "API key required",
                    ErrorContext::new()
                        .with_field_path("api_key")
                        .with_details("set it on the builder or via DTC_API_KEY"),
                )
            })?;

        let timeout = self.timeout.unwrap_or_else(|| {
            Duration::from_secs(
                std::env::var("DTC_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            )
        });

        let verbose = self.verbose.unwrap_or_else(|| {
            matches!(
                std::env::var("DTC_VERBOSE").ok().as_deref(),
                Some("1") | Some("true")
            )
        });

        Ok(ClientConfig {
            base_url,
            api_key,
            timeout,
            verbose,
        })
    }

    /// Build the client.
    pub fn build(self) -> Result<DtcClient> {
        DtcClient::from_config(&self.build_config()?)
    }
}

/// Validate the base URL and strip trailing slashes so endpoint paths can be appended.
fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed).map_err(|e| {
        Error::configuration_with_context(
            format!("Invalid base URL '{}': {}", raw, e),
            ErrorContext::new().with_field_path("base_url"),
        )
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::configuration_with_context(
            format!("Base URL must use http:// or https://, got: {}", raw),
            ErrorContext::new().with_field_path("base_url"),
        ));
    }
    Ok(trimmed.to_string())
}
