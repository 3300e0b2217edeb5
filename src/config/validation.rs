//! Configuration validation.
//!
//! Semantic checks only; serde handles the syntactic ones. Returns every
//! error found rather than stopping at the first.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("{field} `{value}` is not an absolute http(s) URL")]
    Url { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("header name `{0}` in upstream.extra_forward_headers is invalid")]
    HeaderName(String),

    #[error("images quality range is invalid (initial {initial}, floor {floor})")]
    QualityRange { initial: String, floor: String },
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    check_url("upstream.api_url", &config.upstream.api_url, &mut errors);
    check_url("client.base_url", &config.client.base_url, &mut errors);

    for name in &config.upstream.extra_forward_headers {
        if axum::http::HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::HeaderName(name.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.upstream_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }
    if config.images.max_bytes == 0 {
        errors.push(ValidationError::Zero("images.max_bytes"));
    }
    if config.images.max_dimension == 0 {
        errors.push(ValidationError::Zero("images.max_dimension"));
    }

    let images = &config.images;
    let quality_ok = images.quality_step > 0.0
        && images.min_quality > 0.0
        && images.initial_quality <= 1.0
        && images.min_quality <= images.initial_quality;
    if !quality_ok {
        errors.push(ValidationError::QualityRange {
            initial: images.initial_quality.to_string(),
            floor: images.min_quality.to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    let ok = Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if !ok {
        errors.push(ValidationError::Url {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.upstream.api_url = "ftp://backend".into();
        config.timeouts.upstream_secs = 0;
        config.upstream.extra_forward_headers.push("bad header".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero("timeouts.upstream_secs")));
        assert!(errors[1].to_string().contains("upstream.api_url"));
    }

    #[test]
    fn test_quality_floor_above_start_rejected() {
        let mut config = GatewayConfig::default();
        config.images.min_quality = 0.9;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::QualityRange { .. }));
    }
}
