//! Agent configuration

use anyhow::Result;
use serde::Deserialize;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name reported in structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Bound on a single notification delivery in seconds
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_secs: u64,

    /// Lookback for statistical baselines in days
    #[serde(default = "default_history_window")]
    pub history_window_days: i64,

    /// Alert suppression window in seconds
    #[serde(default = "default_dedup_window")]
    pub dedup_window_secs: i64,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "vitals-monitor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_dispatch_timeout() -> u64 {
    5
}

fn default_history_window() -> i64 {
    7
}

fn default_dedup_window() -> i64 {
    3600
}

impl AgentConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MONITOR"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| AgentConfig {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            dispatch_timeout_secs: default_dispatch_timeout(),
            history_window_days: default_history_window(),
            dedup_window_secs: default_dedup_window(),
        }))
    }
}
