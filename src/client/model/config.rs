use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_SESSION_FILE: &str = ".storefront-session.json";
/// the backend authenticates with `Authorization: Token <key>`
pub const DEFAULT_AUTH_SCHEME: &str = "Token";

/// Client configs
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// backend base url including the `/api` suffix
    pub api_url: String,
    /// upper bound for a single request, body included
    pub timeout: Duration,
    pub session_file: PathBuf,
    pub auth_scheme: String,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    pub fn with_auth_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.auth_scheme = scheme.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
