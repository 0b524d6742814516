//! Backend connection settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::warn;

/// Connection settings for the banking backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL every request path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Path of the OTP request endpoint
    #[serde(default = "default_otp_path")]
    pub otp_path: String,

    /// Headers sent with every request
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_otp_path() -> String {
    "/api/otp/request".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            otp_path: default_otp_path(),
            default_headers: HashMap::new(),
        }
    }
}

impl HttpConfig {
    /// Defaults pointed at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Load from `FORMFLOW_API_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source. Unparsable timeouts are
    /// logged and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup("FORMFLOW_API_BASE_URL") {
            config.base_url = base_url;
        }

        if let Some(timeout) = lookup("FORMFLOW_API_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                config.request_timeout_ms = timeout;
            } else {
                warn!("Invalid FORMFLOW_API_TIMEOUT_MS value: {}", timeout);
            }
        }

        if let Some(timeout) = lookup("FORMFLOW_API_CONNECT_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                config.connect_timeout_ms = timeout;
            } else {
                warn!("Invalid FORMFLOW_API_CONNECT_TIMEOUT_MS value: {}", timeout);
            }
        }

        if let Some(path) = lookup("FORMFLOW_API_OTP_PATH") {
            config.otp_path = path;
        }

        config
    }

    /// Join a request path onto the base URL
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
