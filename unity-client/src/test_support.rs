//! Scripted transport for unit tests

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use unity_core::{
    ApiErrorEnvelope, ApiResponse, ApiTransport, ClientSettings, ConnectConfig, Headers,
    HttpMethod, HttpSettings, UnityError, UnityResult,
};

use crate::client::Client;
use crate::uri;

/// Basic credentials the scripted array accepts (`admin:secret`)
const VALID_AUTHORIZATION: &str = "Basic YWRtaW46c2VjcmV0";

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Headers,
    pub body: Option<Value>,
}

type Route = dyn Fn(&RecordedCall) -> UnityResult<ApiResponse> + Send + Sync;

pub struct MockTransport {
    route: Box<Route>,
    emulate_sessions: bool,
    issued_token: Mutex<Option<String>>,
    logins: AtomicUsize,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    /// Every call, login included, goes to `route`
    pub fn new<F>(route: F) -> Self
    where
        F: Fn(&RecordedCall) -> UnityResult<ApiResponse> + Send + Sync + 'static,
    {
        Self {
            route: Box::new(route),
            emulate_sessions: false,
            issued_token: Mutex::new(None),
            logins: AtomicUsize::new(0),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Behave like an array: logins with `admin:secret` issue `token-N`, calls
    /// carrying any other token get a 401, the rest go to `route`
    pub fn array<F>(route: F) -> Self
    where
        F: Fn(&RecordedCall) -> UnityResult<ApiResponse> + Send + Sync + 'static,
    {
        Self {
            emulate_sessions: true,
            ..Self::new(route)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Invalidate the token issued by the last login
    pub fn expire_session(&self) {
        *self.issued_token.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose path starts with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path.starts_with(prefix))
            .count()
    }

    pub fn login_count(&self) -> usize {
        self.count(uri::LOGIN_SESSION_INFO_URI)
    }

    /// Calls other than logins
    pub fn operation_count(&self) -> usize {
        self.calls().len() - self.login_count()
    }

    fn emulate_array(&self, call: &RecordedCall) -> UnityResult<ApiResponse> {
        if call.path == uri::LOGIN_SESSION_INFO_URI {
            if call.headers.get("Authorization").map(String::as_str) != Some(VALID_AUTHORIZATION) {
                return Ok(error_response(401, "Unauthorized"));
            }
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            let token = format!("token-{}", n);
            *self.issued_token.lock().unwrap() = Some(token.clone());
            return Ok(json_response(200, json!({"entries": []})).with_header("EMC-CSRF-TOKEN", &token));
        }

        let valid = self.issued_token.lock().unwrap().clone();
        let sent = call.headers.get("EMC-CSRF-TOKEN").cloned();
        if valid.is_none() || sent != valid {
            return Ok(error_response(401, "Unauthorized"));
        }

        (self.route)(call)
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    async fn do_with_headers(
        &self,
        method: HttpMethod,
        path: &str,
        headers: &Headers,
        body: Option<&Value>,
    ) -> UnityResult<Value> {
        let response = self
            .do_and_get_response_body(method, path, headers, body)
            .await?;
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
        let call = RecordedCall {
            method,
            path: path.to_string(),
            headers: headers.clone(),
            body: body.cloned(),
        };
        self.calls.lock().unwrap().push(call.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.emulate_sessions {
            self.emulate_array(&call)
        } else {
            (self.route)(&call)
        }
    }

    fn parse_json_error(&self, response: &ApiResponse) -> UnityError {
        let detail = response
            .json::<ApiErrorEnvelope>()
            .ok()
            .map(|envelope| envelope.error);
        UnityError::from_status(response.status, detail, "parse_json_error")
    }
}

pub fn json_response(status: u16, body: Value) -> ApiResponse {
    ApiResponse::new(status).with_body(body.to_string())
}

pub fn no_content() -> ApiResponse {
    ApiResponse::new(204)
}

/// Array error envelope with `message`
pub fn error_response(status: u16, message: &str) -> ApiResponse {
    json_response(
        status,
        json!({"error": {
            "errorCode": 131149829,
            "httpStatusCode": status,
            "messages": [{"en-US": message}],
            "created": "2024-01-01T00:00:00.000Z"
        }}),
    )
}

pub fn admin_config() -> ConnectConfig {
    ConnectConfig::new("https://mock", "admin", "secret", true)
}

pub fn client_for(mock: &Arc<MockTransport>) -> Client {
    Client::with_transport(mock.clone(), &ClientSettings::new("https://mock", true))
}

pub fn client_with_deadline(mock: &Arc<MockTransport>, operation_timeout_ms: u64) -> Client {
    let settings = ClientSettings::new("https://mock", true).with_http(HttpSettings {
        operation_timeout_ms: Some(operation_timeout_ms),
        ..HttpSettings::default()
    });
    Client::with_transport(mock.clone(), &settings)
}

/// Client already logged in to a scripted array
pub async fn logged_in_client(mock: &Arc<MockTransport>) -> Client {
    let client = client_for(mock);
    client
        .authenticate(&admin_config())
        .await
        .expect("login to scripted array");
    client
}
