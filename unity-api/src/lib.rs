//! HTTP transport for the Unity management REST API
//!
//! This crate provides the production [`unity_core::ApiTransport`]
//! implementation on top of reqwest. It performs one exchange per call and
//! maps HTTP failures onto [`UnityError`]; sessions are handled by the caller.

use std::collections::HashMap;
use unity_core::{ClientSettings, ErrorContext, UnityError, UnityResult};
use url::Url;

pub mod http;


pub use http::HttpApiClient;

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    /// Skip certificate validation
    pub insecure: bool,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
    /// Additional headers sent on every request
    pub headers: HashMap<String, String>,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout_seconds: 120,
            user_agent: "unity-rs/0.1".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl ApiClientOptions {
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            insecure: settings.insecure,
            timeout_seconds: settings.http.timeout_seconds,
            user_agent: settings.http.user_agent.clone(),
            headers: HashMap::new(),
        }
    }

    /// Set additional header
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

/// Parse the configured endpoint, defaulting to https when no scheme is given
pub fn parse_endpoint(endpoint: &str) -> UnityResult<Url> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(UnityError::Config {
            message: "missing endpoint".to_string(),
            source: None,
            context: ErrorContext::new("http_client")
                .with_operation("parse_endpoint")
                .with_suggestion("Set UNITY_ENDPOINT to the array management address"),
        });
    }

    let candidate = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };

    let url = Url::parse(&candidate).map_err(|e| UnityError::Config {
        message: format!("Invalid endpoint '{}': {}", endpoint, e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("http_client").with_operation("parse_endpoint"),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UnityError::Config {
            message: format!("Unsupported endpoint scheme: {}", other),
            source: None,
            context: ErrorContext::new("http_client")
                .with_operation("parse_endpoint")
                .with_suggestion("Use an http:// or https:// endpoint"),
        }),
    }
}

/// Helper function to create HTTP client with common configuration
pub(crate) fn create_http_client(options: &ApiClientOptions) -> UnityResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&options.user_agent).map_err(|e| {
            UnityError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    for (key, value) in &options.headers {
        let (name, value) = header_pair(key, value)?;
        headers.insert(name, value);
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(options.timeout_seconds))
        .default_headers(headers)
        .danger_accept_invalid_certs(options.insecure)
        // The array pairs the CSRF token with a session cookie
        .cookie_store(true)
        .build()
        .map_err(|e| UnityError::Config {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })?;

    Ok(client)
}

pub(crate) fn header_pair(
    key: &str,
    value: &str,
) -> UnityResult<(reqwest::header::HeaderName, reqwest::header::HeaderValue)> {
    let name = reqwest::header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
        UnityError::Config {
            message: format!("Invalid header name '{}': {}", key, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("build_headers"),
        }
    })?;

    // Never echo the value, it may carry a credential
    let value = reqwest::header::HeaderValue::from_str(value).map_err(|e| UnityError::Config {
        message: format!("Invalid header value for '{}'", key),
        source: Some(Box::new(e)),
        context: ErrorContext::new("http_client").with_operation("build_headers"),
    })?;

    Ok((name, value))
}
