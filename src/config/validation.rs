//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, timeouts > 0, ratios in range)
//! - Check that addresses are absolute http(s) URLs
//!
//! All problems are collected so a bad file is reported in one pass.

use thiserror::Error;
use url::Url;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(base) = &config.base_address {
        if let Err(message) = check_base_address(base) {
            errors.push(ValidationError::new("base_address", message));
        }
    }

    if config.connection_limit == 0 {
        errors.push(ValidationError::new("connection_limit", "must be a positive integer"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be positive"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be positive"));
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if retries.base_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }
    if !(0.0..=1.0).contains(&retries.budget_ratio) {
        errors.push(ValidationError::new("retries.budget_ratio", "must be within 0.0..=1.0"));
    }

    if config.cache.max_entries == 0 {
        errors.push(ValidationError::new("cache.max_entries", "must be positive"));
    }

    for name in config.default_headers.keys() {
        if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("default_headers.{}", name),
                "is not a valid header name",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check that `address` is an absolute http(s) URL.
pub fn check_base_address(address: &str) -> Result<Url, String> {
    let url = Url::parse(address).map_err(|e| format!("not a valid URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme `{}`", other)),
    }
    if url.host_str().is_none() {
        return Err("has no host".to_string());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_problem() {
        let mut config = ClientConfig::default();
        config.connection_limit = 0;
        config.base_address = Some("ftp://example.com".into());
        config.retries.budget_ratio = 2.0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["base_address", "connection_limit", "retries.budget_ratio"]);
    }

    #[test]
    fn relative_base_address_rejected() {
        assert!(check_base_address("/api").is_err());
        assert!(check_base_address("https://www.baidu.com/").is_ok());
    }
}
