//! Logging setup for Formflow hosts.

use serde::{Deserialize, Serialize};
use std::env;

pub mod logging;
pub use logging::{build_filter, init_logging};

/// Configuration for initializing logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Filter directives used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// JSON logs for aggregation; pretty logs otherwise
    #[serde(default)]
    pub enable_json_logging: bool,
}

fn default_service_name() -> String {
    "formflow".to_string()
}

fn default_log_filter() -> String {
    "info,formflow_core=debug".to_string()
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_filter: default_log_filter(),
            enable_json_logging: false,
        }
    }
}

impl MonitoringConfig {
    /// Load from `FORMFLOW_SERVICE_NAME`, `FORMFLOW_LOG_FILTER` and
    /// `FORMFLOW_LOG_JSON`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = env::var("FORMFLOW_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Ok(filter) = env::var("FORMFLOW_LOG_FILTER") {
            config.log_filter = filter;
        }
        if let Ok(json) = env::var("FORMFLOW_LOG_JSON") {
            config.enable_json_logging = json.to_lowercase() == "true" || json == "1";
        }

        config
    }
}
