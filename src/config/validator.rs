use reqwest::Url;

use crate::error::{AppError, Result};

use super::ServiceConfig;

/// Validate a service configuration and surface every problem in one error.
pub fn validate_service_config(config: &ServiceConfig) -> Result<()> {
    let mut issues = Vec::new();

    validate_base_uri("extraction_base_uri", &config.extraction_base_uri, &mut issues);
    validate_base_uri("stream_base_uri", &config.stream_base_uri, &mut issues);
    validate_timing(config, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "service config invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_base_uri(name: &str, value: &str, issues: &mut Vec<String>) {
    if value.trim().is_empty() {
        issues.push(format!("{name} must not be empty"));
        return;
    }

    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => issues.push(format!(
            "{name} uses unsupported scheme `{}`",
            url.scheme()
        )),
        Err(err) => issues.push(format!("{name} `{value}` is not an absolute URL: {err}")),
    }
}

fn validate_timing(config: &ServiceConfig, issues: &mut Vec<String>) {
    if config.poll.interval_secs == 0 {
        issues.push("poll.interval_secs must be greater than zero".to_string());
    }
    if config.poll.max_attempts == Some(0) {
        issues.push("poll.max_attempts must be at least 1 when set".to_string());
    }
    if config.poll.deadline_secs == Some(0) {
        issues.push("poll.deadline_secs must be greater than zero when set".to_string());
    }
    if config.request_timeout_secs == 0 {
        issues.push("request_timeout_secs must be greater than zero".to_string());
    }
}
