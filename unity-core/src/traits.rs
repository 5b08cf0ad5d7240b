//! Core trait definitions

use crate::error::{UnityError, UnityResult};
use crate::types::{ApiResponse, Headers, HttpMethod};
use async_trait::async_trait;
use serde_json::Value;

/// Single HTTP exchange with the array's management endpoint.
///
/// Implementations know nothing about sessions: the caller supplies every
/// header, including the session token. Successful responses come back as
/// JSON (`Value::Null` for an empty body); non-2xx responses are turned into
/// a [`UnityError`] through [`ApiTransport::parse_json_error`].
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Send a request and decode a successful JSON response
    async fn do_with_headers(
        &self,
        method: HttpMethod,
        path: &str,
        headers: &Headers,
        body: Option<&Value>,
    ) -> UnityResult<Value>;

    /// Send a request and hand back the raw response whatever its status
    async fn do_and_get_response_body(
        &self,
        method: HttpMethod,
        path: &str,
        headers: &Headers,
        body: Option<&Value>,
    ) -> UnityResult<ApiResponse>;

    /// Turn a non-2xx response into an error carrying its status and body
    fn parse_json_error(&self, response: &ApiResponse) -> UnityError;

    async fn get(&self, path: &str, headers: &Headers) -> UnityResult<Value> {
        self.do_with_headers(HttpMethod::Get, path, headers, None)
            .await
    }

    async fn post(&self, path: &str, headers: &Headers, body: Option<&Value>) -> UnityResult<Value> {
        self.do_with_headers(HttpMethod::Post, path, headers, body)
            .await
    }

    async fn put(&self, path: &str, headers: &Headers, body: Option<&Value>) -> UnityResult<Value> {
        self.do_with_headers(HttpMethod::Put, path, headers, body)
            .await
    }

    async fn delete(&self, path: &str, headers: &Headers) -> UnityResult<Value> {
        self.do_with_headers(HttpMethod::Delete, path, headers, None)
            .await
    }
}
