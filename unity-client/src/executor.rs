//! Authenticated request execution with a single re-login retry

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use unity_core::{
    decode_error, with_optional_timeout, ErrorContext, ErrorKind, HttpMethod, UnityError,
    UnityResult,
};

use crate::client::{rest_headers, Client};

/// How the session layer reacts to the result of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The array rejected the session token
    AuthExpired,
    ClientError,
    ServerError,
}

impl Outcome {
    pub fn classify<T>(result: &UnityResult<T>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => Self::of_error(e),
        }
    }

    pub fn of_error(error: &UnityError) -> Self {
        match error.kind() {
            ErrorKind::AuthExpired => Outcome::AuthExpired,
            ErrorKind::Server => Outcome::ServerError,
            ErrorKind::Validation | ErrorKind::Client | ErrorKind::Decode => Outcome::ClientError,
        }
    }
}

enum RetryState {
    Attempt,
    Reauthenticate { rejected_token: String },
    Retry,
}

impl Client {
    /// Run one request with the cached token.
    ///
    /// When the array reports the session as expired the client logs in again
    /// with the stored credentials and repeats the request exactly once. The
    /// result of that second attempt is returned as is.
    pub async fn execute_with_retry_authenticate(
        &self,
        method: HttpMethod,
        uri: &str,
        body: Option<&Value>,
    ) -> UnityResult<Value> {
        let mut state = RetryState::Attempt;
        loop {
            state = match state {
                RetryState::Attempt => {
                    let token = self.get_token().await;
                    let result = self.dispatch(method, uri, &token, body).await;
                    match Outcome::classify(&result) {
                        Outcome::AuthExpired => {
                            warn!(method = %method, uri = %uri, "Unity session expired");
                            RetryState::Reauthenticate {
                                rejected_token: token,
                            }
                        }
                        _ => return result,
                    }
                }
                RetryState::Reauthenticate { rejected_token } => {
                    self.reauthenticate(&rejected_token).await?;
                    RetryState::Retry
                }
                RetryState::Retry => {
                    let token = self.get_token().await;
                    debug!(method = %method, uri = %uri, "Retrying after re-authentication");
                    return self.dispatch(method, uri, &token, body).await;
                }
            };
        }
    }

    /// [`Client::execute_with_retry_authenticate`] decoding the response into `T`
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        uri: &str,
        body: Option<&Value>,
    ) -> UnityResult<T> {
        let value = self.execute_with_retry_authenticate(method, uri, body).await?;
        decode(value)
    }

    /// [`Client::execute_with_retry_authenticate`] ignoring the response body
    pub async fn execute_no_content(
        &self,
        method: HttpMethod,
        uri: &str,
        body: Option<&Value>,
    ) -> UnityResult<()> {
        self.execute_with_retry_authenticate(method, uri, body)
            .await
            .map(|_| ())
    }

    /// Log in again unless another caller already replaced `rejected_token`
    async fn reauthenticate(&self, rejected_token: &str) -> UnityResult<()> {
        let mut session = self.session.lock().await;

        if session.is_authenticated() && session.token() != rejected_token {
            debug!("Session already refreshed by a concurrent request");
            return Ok(());
        }

        let config = session.connect_config().cloned().ok_or_else(|| {
            UnityError::Authentication {
                message: "session expired and no credentials are stored".to_string(),
                status: None,
                body: None,
                context: ErrorContext::new("executor")
                    .with_operation("reauthenticate")
                    .with_suggestion("Call authenticate before issuing requests"),
            }
        })?;

        info!(endpoint = %session.endpoint(), "Re-authenticating with Unity array");
        self.login(&mut session, &config).await
    }

    async fn dispatch(
        &self,
        method: HttpMethod,
        uri: &str,
        token: &str,
        body: Option<&Value>,
    ) -> UnityResult<Value> {
        debug!(method = %method, uri = %uri, "Executing Unity request");
        let operation = format!("{} {}", method, uri);
        with_optional_timeout(
            self.api
                .do_with_headers(method, uri, &rest_headers(token), body),
            self.operation_timeout_ms,
            &operation,
        )
        .await
    }
}

pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> UnityResult<T> {
    serde_json::from_value(value)
        .map_err(|e| decode_error!(format!("Unexpected response shape: {}", e), "executor", e))
}

pub(crate) fn to_body<S: Serialize>(request: &S) -> UnityResult<Value> {
    serde_json::to_value(request)
        .map_err(|e| decode_error!(format!("Failed to encode request: {}", e), "executor", e))
}
