//! Per-client session state

use unity_core::ConnectConfig;

/// Token and credentials of one array login.
///
/// Owned by a single [`crate::Client`] behind its lock; never shared across
/// endpoints.
#[derive(Debug, Clone)]
pub struct Session {
    endpoint: String,
    insecure: bool,
    connect_config: Option<ConnectConfig>,
    token: Option<String>,
}

impl Session {
    pub fn new(endpoint: &str, insecure: bool) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            insecure,
            connect_config: None,
            token: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn insecure(&self) -> bool {
        self.insecure
    }

    /// Current token, empty when none has been stored
    pub fn token(&self) -> &str {
        self.token.as_deref().unwrap_or_default()
    }

    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    /// Credentials of the last successful login
    pub fn connect_config(&self) -> Option<&ConnectConfig> {
        self.connect_config.as_ref()
    }

    /// Replace the session after a login
    pub fn replace(&mut self, config: ConnectConfig, token: String) {
        self.connect_config = Some(config);
        self.token = Some(token);
    }

    pub fn clear(&mut self) {
        self.connect_config = None;
        self.token = None;
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token().is_empty()
    }
}
