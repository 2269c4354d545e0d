use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod loader;
pub mod validator;

pub use loader::{load_service_config, resolve_service_config};
pub use validator::validate_service_config;

pub const DEFAULT_EXTRACTION_BASE_URI: &str = "https://hosted.datascopeapi.reuters.com";
pub const DEFAULT_STREAM_BASE_URI: &str = "http://product.datastream.com";

const EXTRACTION_BASE_ENV: &str = "DSS_BASE_URI";
const STREAM_BASE_ENV: &str = "DATA_STREAM_BASE_URI";

/// Endpoints and timing knobs for talking to the extraction and streaming services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub extraction_base_uri: String,
    pub stream_base_uri: String,
    /// Seconds the service may hold a submission before answering asynchronously.
    pub prefer_wait_secs: u64,
    pub request_timeout_secs: u64,
    pub poll: PollSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_secs: u64,
    pub max_attempts: Option<u32>,
    pub deadline_secs: Option<u64>,
}

/// Runtime form of [`PollSettings`] consumed by the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: None,
            deadline_secs: None,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollSettings::default().policy()
    }
}

impl ServiceConfig {
    pub fn builtin() -> Self {
        Self {
            extraction_base_uri: DEFAULT_EXTRACTION_BASE_URI.to_string(),
            stream_base_uri: DEFAULT_STREAM_BASE_URI.to_string(),
            prefer_wait_secs: 5,
            request_timeout_secs: 30,
            poll: PollSettings::default(),
        }
    }

    /// Replace base URIs with values from the environment when present.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(uri) = non_empty_env(EXTRACTION_BASE_ENV) {
            self.extraction_base_uri = uri;
        }
        if let Some(uri) = non_empty_env(STREAM_BASE_ENV) {
            self.stream_base_uri = uri;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll.policy()
    }
}

impl PollSettings {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.interval_secs),
            max_attempts: self.max_attempts,
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_polls_every_five_seconds_without_limit() {
        let policy = ServiceConfig::builtin().poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.deadline, None);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"poll": {"deadline_secs": 600}}"#).unwrap();
        assert_eq!(config.extraction_base_uri, DEFAULT_EXTRACTION_BASE_URI);
        assert_eq!(config.poll.interval_secs, 5);
        assert_eq!(
            config.poll_policy().deadline,
            Some(Duration::from_secs(600))
        );
    }
}
