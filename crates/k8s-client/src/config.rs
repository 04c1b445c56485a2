//! Client configuration
//!
//! Loaded from environment variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `K8S_SERVER` | `http://127.0.0.1:8001` (a local `kubectl proxy`) |
//! | `K8S_TOKEN` | none (no `Authorization` header) |
//! | `K8S_REQUEST_TIMEOUT_SECS` | `30` |
//! | `K8S_CONNECT_TIMEOUT_SECS` | `10` |

use crate::error::ClientError;
use std::env;
use std::time::Duration;

/// Local `kubectl proxy` endpoint
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8001";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for [`HttpClient`](crate::HttpClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API server base URL
    pub server: String,
    /// Bearer token
    pub token: Option<String>,
    /// Timeout for request/response calls; watch streams are not subject to it
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: format!("k8s-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Config for `server` with every other setting defaulted
    pub fn new(server: impl Into<String>) -> Result<Self, ClientError> {
        let config = Self {
            server: server.into(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Send `token` as a bearer credential
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Timeout for non-streaming requests
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let server = lookup("K8S_SERVER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.server);
        let token = lookup("K8S_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let request_timeout = parse_secs(&lookup, "K8S_REQUEST_TIMEOUT_SECS")?.unwrap_or(defaults.request_timeout);
        let connect_timeout = parse_secs(&lookup, "K8S_CONNECT_TIMEOUT_SECS")?.unwrap_or(defaults.connect_timeout);

        let config = Self {
            server,
            token,
            request_timeout,
            connect_timeout,
            user_agent: defaults.user_agent,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ClientError> {
        if !(self.server.starts_with("http://") || self.server.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "server URL must start with http:// or https://, got '{}'",
                self.server
            )));
        }
        Ok(())
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ClientError::InvalidConfig(format!("{} must be a whole number of seconds, got '{}'", key, raw))),
    }
}
