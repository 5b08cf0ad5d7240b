//! Client bound to one array endpoint

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use unity_api::HttpApiClient;
use unity_core::{
    decode_error, headers, with_optional_timeout, ApiTransport, ClientSettings, ConnectConfig,
    Headers, HttpMethod, UnityResult,
};

use crate::filesystem::FilesystemApi;
use crate::license::LicenseApi;
use crate::session::Session;
use crate::snapshot::SnapshotApi;
use crate::types::{BasicSystemInfo, Collection};
use crate::uri;
use crate::volume::VolumeApi;

/// Management client for one array.
///
/// Holds the transport and the session of a single endpoint. Share it through
/// an `Arc`; every operation takes `&self`. The session lock is held only by
/// the token accessors and by login, never across a resource request.
pub struct Client {
    pub(crate) api: Arc<dyn ApiTransport>,
    pub(crate) session: Mutex<Session>,
    pub(crate) operation_timeout_ms: Option<u64>,
}

impl Client {
    /// Build a client from the `UNITY_*` environment variables
    pub fn new() -> UnityResult<Self> {
        Self::from_settings(&ClientSettings::from_env())
    }

    pub fn new_with_args(endpoint: &str, insecure: bool) -> UnityResult<Self> {
        Self::from_settings(&ClientSettings::new(endpoint, insecure))
    }

    pub fn from_settings(settings: &ClientSettings) -> UnityResult<Self> {
        settings.validate()?;
        let api = HttpApiClient::from_settings(settings)?;
        Ok(Self::with_transport(Arc::new(api), settings))
    }

    /// Build a client over any transport
    pub fn with_transport(api: Arc<dyn ApiTransport>, settings: &ClientSettings) -> Self {
        Self {
            api,
            session: Mutex::new(Session::new(&settings.endpoint, settings.insecure)),
            operation_timeout_ms: settings.http.operation_timeout_ms,
        }
    }

    pub async fn endpoint(&self) -> String {
        self.session.lock().await.endpoint().to_string()
    }

    /// Log in and cache the session token.
    ///
    /// The lock is held for the whole exchange, so concurrent logins on the
    /// same client run one after another. On failure the session is left as
    /// it was.
    pub async fn authenticate(&self, config: &ConnectConfig) -> UnityResult<()> {
        let mut session = self.session.lock().await;
        self.login(&mut session, config).await
    }

    /// One login exchange; the caller holds the session lock
    pub(crate) async fn login(&self, session: &mut Session, config: &ConnectConfig) -> UnityResult<()> {
        debug!(
            endpoint = %session.endpoint(),
            username = %config.username,
            "Logging in to Unity array"
        );

        let response = with_optional_timeout(
            self.api.do_and_get_response_body(
                HttpMethod::Get,
                uri::LOGIN_SESSION_INFO_URI,
                &login_headers(config),
                None,
            ),
            self.operation_timeout_ms,
            "login",
        )
        .await?;

        if !response.is_success() {
            let err = self.api.parse_json_error(&response);
            err.log();
            return Err(err);
        }

        let token = response
            .header(headers::EMC_CSRF_TOKEN)
            .unwrap_or_default()
            .to_string();
        if token.is_empty() {
            warn!(
                endpoint = %session.endpoint(),
                "Login succeeded without an EMC-CSRF-TOKEN header"
            );
        }

        session.replace(config.clone(), token);
        info!(
            endpoint = %session.endpoint(),
            username = %config.username,
            "Authenticated with Unity array"
        );
        Ok(())
    }

    pub async fn set_token(&self, token: &str) {
        self.session.lock().await.set_token(token);
    }

    /// Current token, empty before the first login
    pub async fn get_token(&self) -> String {
        self.session.lock().await.token().to_string()
    }

    /// Identity and software version of the array; needs no login
    pub async fn basic_system_info(&self) -> UnityResult<BasicSystemInfo> {
        let value = with_optional_timeout(
            self.api
                .get(uri::BASIC_SYSTEM_INFO_URI, &rest_headers("")),
            self.operation_timeout_ms,
            "basic_system_info",
        )
        .await?;

        let collection: Collection<BasicSystemInfo> = crate::executor::decode(value)?;
        collection
            .into_contents()
            .into_iter()
            .next()
            .ok_or_else(|| decode_error!("basic system info has no entries", "client"))
    }

    /// End the array session and forget the token and credentials.
    ///
    /// The session is cleared even when the array rejects the call.
    pub async fn logout(&self) -> UnityResult<()> {
        let mut session = self.session.lock().await;
        if !session.is_authenticated() {
            session.clear();
            return Ok(());
        }

        let result = with_optional_timeout(
            self.api.post(
                uri::LOGOUT_URI,
                &rest_headers(session.token()),
                Some(&serde_json::json!({ "localCleanupOnly": true })),
            ),
            self.operation_timeout_ms,
            "logout",
        )
        .await;

        session.clear();
        match result {
            Ok(_) => {
                info!(endpoint = %session.endpoint(), "Logged out of Unity array");
                Ok(())
            }
            Err(e) => {
                e.log();
                Err(e)
            }
        }
    }

    pub fn snapshots(&self) -> SnapshotApi<'_> {
        SnapshotApi::new(self)
    }

    pub fn volumes(&self) -> VolumeApi<'_> {
        VolumeApi::new(self)
    }

    pub fn filesystems(&self) -> FilesystemApi<'_> {
        FilesystemApi::new(self)
    }

    pub fn licenses(&self) -> LicenseApi<'_> {
        LicenseApi::new(self)
    }
}

/// JSON headers plus the session token when there is one
pub(crate) fn rest_headers(token: &str) -> Headers {
    let mut map = Headers::new();
    map.insert(
        headers::CONTENT_TYPE.to_string(),
        headers::APPLICATION_JSON.to_string(),
    );
    map.insert(headers::ACCEPT.to_string(), headers::APPLICATION_JSON.to_string());
    map.insert(headers::X_EMC_REST_CLIENT.to_string(), "true".to_string());
    if !token.is_empty() {
        map.insert(headers::EMC_CSRF_TOKEN.to_string(), token.to_string());
    }
    map
}

fn login_headers(config: &ConnectConfig) -> Headers {
    let credentials = STANDARD.encode(format!("{}:{}", config.username, config.password));
    let mut map = rest_headers("");
    map.insert(
        headers::AUTHORIZATION.to_string(),
        format!("Basic {}", credentials),
    );
    map
}
