//! Wire-level types shared by the transport and the client

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{ErrorContext, UnityError, UnityResult};

/// Header names used by the array's REST API
pub mod headers {
    pub const AUTHORIZATION: &str = "Authorization";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const ACCEPT: &str = "Accept";
    pub const APPLICATION_JSON: &str = "application/json";
    /// Must be present on every request, including login
    pub const X_EMC_REST_CLIENT: &str = "X-EMC-REST-CLIENT";
    /// Session token returned by login and echoed on every later request
    pub const EMC_CSRF_TOKEN: &str = "EMC-CSRF-TOKEN";
}

/// Header map passed to the transport
pub type Headers = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw response returned by [`crate::ApiTransport::do_and_get_response_body`]
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, keys lowercased
    pub headers: HashMap<String, String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON; an empty body decodes as `null`
    pub fn json<T: DeserializeOwned>(&self) -> UnityResult<T> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };

        serde_json::from_slice(body).map_err(|e| UnityError::Decode {
            message: format!("Failed to decode response body: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("api_response")
                .with_operation("json")
                .with_metadata("http_status", &self.status.to_string()),
        })
    }
}

/// Error body reported by the array
///
/// ```json
/// {"error": {"errorCode": 131149829, "httpStatusCode": 404,
///            "messages": [{"en-US": "The requested resource does not exist."}],
///            "created": "2024-01-01T00:00:00.000Z"}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub http_status_code: u16,
    #[serde(default)]
    pub messages: Vec<HashMap<String, String>>,
    #[serde(default)]
    pub created: Option<String>,
}

impl ApiErrorDetail {
    /// First message, preferring the en-US locale
    pub fn message(&self) -> Option<String> {
        let first = self.messages.first()?;
        first
            .get("en-US")
            .or_else(|| first.values().next())
            .cloned()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorDetail,
}
