//! reqwest implementation of the transport capability

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};
use unity_core::{
    ApiErrorDetail, ApiErrorEnvelope, ApiResponse, ApiTransport, ClientSettings, ErrorContext,
    Headers, HttpMethod, UnityError, UnityResult,
};

use super::{create_http_client, header_pair, parse_endpoint, ApiClientOptions};

const MAX_ERROR_TEXT: usize = 512;

/// HTTP transport bound to one array endpoint
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
    options: ApiClientOptions,
}

impl HttpApiClient {
    /// Create a transport for `endpoint`
    pub fn new(endpoint: &str, options: ApiClientOptions) -> UnityResult<Self> {
        let url = parse_endpoint(endpoint)?;
        let client = create_http_client(&options)?;
        let base_url = url.as_str().trim_end_matches('/').to_string();

        info!(
            endpoint = %base_url,
            insecure = options.insecure,
            "Created Unity API client"
        );

        Ok(Self {
            client,
            base_url,
            options,
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> UnityResult<Self> {
        Self::new(&settings.endpoint, ApiClientOptions::from_settings(settings))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send one request; only transport-level failures are errors here
    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        headers: &Headers,
        body: Option<&Value>,
    ) -> UnityResult<ApiResponse> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "Sending Unity API request");

        let mut request = self.client.request(to_reqwest_method(method), &url);
        for (key, value) in headers {
            let (name, value) = header_pair(key, value)?;
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e, method, path))?;

        let status = response.status().as_u16();
        let mut response_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                response_headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e, method, path))?;

        debug!(method = %method, url = %url, status = status, "Received Unity API response");

        Ok(ApiResponse {
            status,
            headers: response_headers,
            body: body.to_vec(),
        })
    }

    fn transport_error(&self, e: reqwest::Error, method: HttpMethod, path: &str) -> UnityError {
        let operation = format!("{} {}", method, path);
        if e.is_timeout() {
            return UnityError::Timeout {
                operation,
                duration_ms: self.options.timeout_seconds * 1000,
                context: ErrorContext::new("http_client")
                    .with_operation("send")
                    .with_suggestion("Increase the HTTP timeout")
                    .with_suggestion("Check network connectivity to the array"),
            };
        }

        UnityError::Network {
            message: format!("Request {} failed: {}", operation, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client")
                .with_operation("send")
                .with_metadata("endpoint", &self.base_url)
                .with_suggestion("Check network connectivity and the array address"),
        }
    }
}

#[async_trait]
impl ApiTransport for HttpApiClient {
    async fn do_with_headers(
        &self,
        method: HttpMethod,
        path: &str,
        headers: &Headers,
        body: Option<&Value>,
    ) -> UnityResult<Value> {
        let response = self.send(method, path, headers, body).await?;
        if !response.is_success() {
            return Err(self.parse_json_error(&response));
        }
        response.json()
    }

    async fn do_and_get_response_body(
        &self,
        method: HttpMethod,
        path: &str,
        headers: &Headers,
        body: Option<&Value>,
    ) -> UnityResult<ApiResponse> {
        self.send(method, path, headers, body).await
    }

    fn parse_json_error(&self, response: &ApiResponse) -> UnityError {
        let detail = match response.json::<ApiErrorEnvelope>() {
            Ok(envelope) => Some(envelope.error),
            Err(_) => plain_text_detail(response),
        };

        UnityError::from_status(response.status, detail, "parse_json_error")
    }
}

/// Keep a non-JSON error body readable
fn plain_text_detail(response: &ApiResponse) -> Option<ApiErrorDetail> {
    let text = String::from_utf8_lossy(&response.body);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let text: String = text.chars().take(MAX_ERROR_TEXT).collect();
    let mut message = HashMap::new();
    message.insert("en-US".to_string(), text);

    Some(ApiErrorDetail {
        error_code: None,
        http_status_code: response.status,
        messages: vec![message],
        created: None,
    })
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}
