//! Errors returned by the Unity crates
//!
//! Every failure carries an [`ErrorContext`] for diagnostics and maps to one
//! [`ErrorKind`], which is what the session layer decides on.

use crate::types::ApiErrorDetail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, error, warn};

pub type UnityResult<T> = Result<T, UnityError>;

/// Diagnostics attached to an error. Never holds credentials or tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Correlates the log line with the error returned to the caller
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    /// Crate or module that raised the error
    pub component: String,
    /// Request line or API call in flight, e.g. `GET /api/instances/snap/1`
    pub operation: Option<String>,
    pub metadata: HashMap<String, String>,
    /// Hints for the operator
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad caller input, no network call was made
    Validation,
    /// The array rejected the session token (HTTP 401)
    AuthExpired,
    /// Any other 4xx
    Client,
    /// 5xx, network failure, timeout or cancellation
    Server,
    /// The response body did not match the expected shape
    Decode,
}

/// Main error type for the Unity client
#[derive(Error, Debug)]
pub enum UnityError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        status: Option<u16>,
        body: Option<ApiErrorDetail>,
        context: ErrorContext,
    },

    #[error("HTTP {status} error: {message}")]
    Client {
        status: u16,
        message: String,
        body: Option<ApiErrorDetail>,
        context: ErrorContext,
    },

    #[error("HTTP {status} server error: {message}")]
    Server {
        status: u16,
        message: String,
        body: Option<ApiErrorDetail>,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl UnityError {
    /// Build the error matching an HTTP status returned by the array.
    ///
    /// 401 becomes [`UnityError::Authentication`], other 4xx become
    /// [`UnityError::Client`], everything else [`UnityError::Server`]. The
    /// array's error body is kept for inspection.
    pub fn from_status(status: u16, body: Option<ApiErrorDetail>, operation: &str) -> Self {
        let message = body
            .as_ref()
            .and_then(|b| b.message())
            .unwrap_or_else(|| default_reason(status).to_string());

        let context = ErrorContext::new("unity_api")
            .with_operation(operation)
            .with_metadata("http_status", &status.to_string())
            .with_suggestion(match status {
                401 => "Check the array credentials or log in again",
                403 => "Check the role of the array user",
                404 => "Resource not found on the array",
                409 => "Resource already exists or is in use",
                _ => "Check network connectivity and array health",
            });

        match status {
            401 => UnityError::Authentication {
                message,
                status: Some(status),
                body,
                context,
            },
            400..=499 => UnityError::Client {
                status,
                message,
                body,
                context,
            },
            _ => UnityError::Server {
                status,
                message,
                body,
                context,
            },
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnityError::Validation { .. } | UnityError::Config { .. } => ErrorKind::Validation,
            UnityError::Authentication { .. } => ErrorKind::AuthExpired,
            UnityError::Client { .. } => ErrorKind::Client,
            UnityError::Server { .. } | UnityError::Network { .. } | UnityError::Timeout { .. } => {
                ErrorKind::Server
            }
            UnityError::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// HTTP status code reported by the array, if the error came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            UnityError::Authentication { status, .. } => *status,
            UnityError::Client { status, .. } | UnityError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Error body reported by the array, if any
    pub fn body(&self) -> Option<&ApiErrorDetail> {
        match self {
            UnityError::Authentication { body, .. }
            | UnityError::Client { body, .. }
            | UnityError::Server { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            UnityError::Validation { context, .. }
            | UnityError::Authentication { context, .. }
            | UnityError::Client { context, .. }
            | UnityError::Server { context, .. }
            | UnityError::Network { context, .. }
            | UnityError::Timeout { context, .. }
            | UnityError::Decode { context, .. }
            | UnityError::Config { context, .. } => context,
        }
    }

    /// Plain message without the variant prefix
    pub fn message(&self) -> String {
        match self {
            UnityError::Validation { message, .. }
            | UnityError::Authentication { message, .. }
            | UnityError::Client { message, .. }
            | UnityError::Server { message, .. }
            | UnityError::Network { message, .. }
            | UnityError::Decode { message, .. }
            | UnityError::Config { message, .. } => message.clone(),
            UnityError::Timeout { operation, .. } => operation.clone(),
        }
    }

    /// True for a 404 reported by the array
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Emit one event at a level matching the kind
    pub fn log(&self) {
        let error_id = &self.context().error_id;
        match self.kind() {
            ErrorKind::Validation => {
                debug!(error_id = %error_id, error = %self, "Rejected invalid input");
            }
            ErrorKind::AuthExpired => {
                warn!(error_id = %error_id, error = %self, "Array rejected the session");
            }
            ErrorKind::Server => {
                warn!(
                    error_id = %error_id,
                    error = %self,
                    "Network or server error"
                );
            }
            ErrorKind::Client | ErrorKind::Decode => {
                error!(error_id = %error_id, error = %self, "Error occurred");
            }
        }
    }
}

fn default_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown error",
    }
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::UnityError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::UnityError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check UNITY_* environment variables")
                .with_suggestion("Check your configuration file"),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::UnityError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check UNITY_* environment variables")
                .with_suggestion("Check your configuration file"),
        }
    };
}

#[macro_export]
macro_rules! decode_error {
    ($msg:expr, $component:expr) => {
        $crate::UnityError::Decode {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::UnityError::Decode {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn detail(status: u16, text: &str) -> ApiErrorDetail {
        let mut message = HashMap::new();
        message.insert("en-US".to_string(), text.to_string());
        ApiErrorDetail {
            error_code: Some(131149829),
            http_status_code: status,
            messages: vec![message],
            created: None,
        }
    }

    #[test]
    fn test_from_status_classification() {
        assert_eq!(
            UnityError::from_status(401, None, "op").kind(),
            ErrorKind::AuthExpired
        );
        assert_eq!(
            UnityError::from_status(404, None, "op").kind(),
            ErrorKind::Client
        );
        assert_eq!(
            UnityError::from_status(422, None, "op").kind(),
            ErrorKind::Client
        );
        assert_eq!(
            UnityError::from_status(500, None, "op").kind(),
            ErrorKind::Server
        );
        assert_eq!(
            UnityError::from_status(503, None, "op").kind(),
            ErrorKind::Server
        );
    }

    #[test]
    fn test_from_status_keeps_body() {
        let err = UnityError::from_status(404, Some(detail(404, "does not exist")), "find");

        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert_eq!(err.message(), "does not exist");
        assert_eq!(err.body().unwrap().error_code, Some(131149829));
        assert_eq!(err.to_string(), "HTTP 404 error: does not exist");
    }

    #[test]
    fn test_from_status_without_body_uses_reason() {
        let err = UnityError::from_status(503, None, "list");
        assert_eq!(err.message(), "Service Unavailable");
        assert_eq!(err.context().operation.as_deref(), Some("list"));
    }

    #[test]
    fn test_transport_failures_are_server_kind() {
        let network = UnityError::Network {
            message: "connection refused".to_string(),
            source: None,
            context: ErrorContext::new("test"),
        };
        let timeout = UnityError::Timeout {
            operation: "GET /api/types/snap/instances".to_string(),
            duration_ms: 10,
            context: ErrorContext::new("test"),
        };

        assert_eq!(network.kind(), ErrorKind::Server);
        assert_eq!(timeout.kind(), ErrorKind::Server);
        assert_eq!(network.status(), None);
    }

    #[test]
    fn test_validation_macro() {
        let err = validation_error!("snapshot ID cannot be empty", "snapshot_id", "snapshot");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "snapshot ID cannot be empty");
        match err {
            UnityError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("snapshot_id")),
            _ => panic!("Expected Validation error"),
        }
    }
}
