//! platform::factory
//!
//! Platform client creation.
//!
//! # Design
//!
//! Commands use [`create_platform`] instead of constructing a specific
//! implementation, so the engine only ever sees `dyn Platform`.
//!
//! # URL Normalization
//!
//! Operators configure the instance URL the way they type it into a browser
//! (`https://gitlab.example.com`). The REST API lives under `/api/v4`, which
//! is appended unless the URL already ends with it.
//!
//! # Example
//!
//! ```
//! use baseliner::platform::api_base_from_url;
//!
//! assert_eq!(
//!     api_base_from_url("https://gitlab.example.com/").unwrap(),
//!     "https://gitlab.example.com/api/v4"
//! );
//! assert_eq!(
//!     api_base_from_url("https://gitlab.example.com/api/v4").unwrap(),
//!     "https://gitlab.example.com/api/v4"
//! );
//! ```

use reqwest::Url;

use super::gitlab::GitLabPlatform;
use super::traits::Platform;
use crate::core::config::ConfigError;

/// Path of the REST API relative to the instance root.
const API_PATH: &str = "/api/v4";

/// Derive the REST API base from an instance URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if the URL cannot be parsed or does
/// not use `http` or `https`.
pub fn api_base_from_url(url: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| ConfigError::InvalidValue(format!("invalid URL '{}': {}", url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue(format!(
            "unsupported URL scheme '{}' in '{}'",
            parsed.scheme(),
            url
        )));
    }
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidValue(format!(
            "URL '{}' has no host",
            url
        )));
    }

    let base = parsed.as_str().trim_end_matches('/');
    if base.ends_with(API_PATH) {
        Ok(base.to_string())
    } else {
        Ok(format!("{}{}", base, API_PATH))
    }
}

/// Create a platform client for an instance URL.
///
/// No request is made; call [`Platform::authenticate`] to verify the token.
///
/// # Errors
///
/// Returns an error if the URL is invalid or the token is empty.
pub fn create_platform(url: &str, token: &str) -> Result<Box<dyn Platform>, ConfigError> {
    if token.trim().is_empty() {
        return Err(ConfigError::Missing("access token"));
    }
    let api_base = api_base_from_url(url)?;
    Ok(Box::new(GitLabPlatform::new(api_base, token.trim())))
}
