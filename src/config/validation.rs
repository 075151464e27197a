//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (deployments reference configured providers)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: TelemetryConfig → Result<(), Vec<ValidationError>>

use alloy::primitives::Address;
use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::chain::ChainId;
use crate::config::schema::TelemetryConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("chain id '{0}' is not a decimal number")]
    InvalidChainId(String),

    #[error("provider URL for chain {chain}: {reason}")]
    InvalidProviderUrl { chain: String, reason: String },

    #[error("DapiServer address for chain {chain} is invalid: {address}")]
    InvalidDeployment { chain: String, address: String },

    #[error("DapiServer deployed on chain {0} but no provider configured")]
    MissingProvider(String),

    #[error("retry policy '{0}' has a zero attempt timeout")]
    ZeroAttemptTimeout(&'static str),

    #[error("retry policy '{0}' has a total timeout shorter than one attempt")]
    TotalShorterThanAttempt(&'static str),

    #[error("listener.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("transactions.max_age_secs must be greater than zero")]
    ZeroTransactionMaxAge,

    #[error("coingecko.refresh_interval_secs must be greater than zero")]
    ZeroRefreshInterval,

    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("response header '{0}' has an invalid name or value")]
    InvalidHeader(String),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &TelemetryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .listener
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    for (name, value) in &config.headers {
        if name.parse::<HeaderName>().is_err() || HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::InvalidHeader(name.clone()));
        }
    }

    for (chain, url) in &config.providers {
        if chain.parse::<ChainId>().is_err() {
            errors.push(ValidationError::InvalidChainId(chain.clone()));
        }
        if let Err(e) = url.parse::<url::Url>() {
            errors.push(ValidationError::InvalidProviderUrl {
                chain: chain.clone(),
                reason: e.to_string(),
            });
        }
    }

    for (chain, address) in &config.deployments {
        if chain.parse::<ChainId>().is_err() {
            errors.push(ValidationError::InvalidChainId(chain.clone()));
        }
        if address.parse::<Address>().is_err() {
            errors.push(ValidationError::InvalidDeployment {
                chain: chain.clone(),
                address: address.clone(),
            });
        }
        let provider = chain.parse::<ChainId>().ok().and_then(|c| config.provider_for(c));
        if provider.is_none() {
            errors.push(ValidationError::MissingProvider(chain.clone()));
        }
    }

    for (name, policy) in config.retries.iter() {
        if policy.attempt_timeout_ms == 0 {
            errors.push(ValidationError::ZeroAttemptTimeout(name));
        } else if policy.total_timeout_ms < policy.attempt_timeout_ms {
            errors.push(ValidationError::TotalShorterThanAttempt(name));
        }
    }

    if config.transactions.max_age_secs == 0 {
        errors.push(ValidationError::ZeroTransactionMaxAge);
    }

    if config.coingecko.refresh_interval_secs == 0 {
        errors.push(ValidationError::ZeroRefreshInterval);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TelemetryConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = TelemetryConfig::default();
        config
            .providers
            .insert("mainnet".to_string(), "https://rpc.example.org".to_string());
        config
            .deployments
            .insert("5".to_string(), "0x1234".to_string());
        config.retries.http.total_timeout_ms = 10;
        config.transactions.max_age_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidChainId("mainnet".to_string())));
        assert!(errors.contains(&ValidationError::InvalidDeployment {
            chain: "5".to_string(),
            address: "0x1234".to_string(),
        }));
        assert!(errors.contains(&ValidationError::MissingProvider("5".to_string())));
        assert!(errors.contains(&ValidationError::TotalShorterThanAttempt("http")));
        assert!(errors.contains(&ValidationError::ZeroTransactionMaxAge));
    }

    #[test]
    fn test_invalid_response_header() {
        let mut config = TelemetryConfig::default();
        config
            .headers
            .insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
        config
            .headers
            .insert("bad header".to_string(), "x".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidHeader("bad header".to_string())]);
    }

    #[test]
    fn test_zero_request_timeout() {
        let mut config = TelemetryConfig::default();
        config.listener.request_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ZeroRequestTimeout]);
    }

    #[test]
    fn test_zero_attempt_timeout() {
        let mut config = TelemetryConfig::default();
        config.retries.rpc.attempt_timeout_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::ZeroAttemptTimeout("rpc")]);
    }
}
