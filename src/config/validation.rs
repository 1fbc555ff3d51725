//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges, URLs, addresses and
//! that every configured call signature parses. All errors are returned, not
//! just the first.

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::ledger::abi::SubscriptionAbi;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    if let Err(e) = config.ledger.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new("ledger.rpc_url", e.to_string()));
    }
    if config.ledger.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.rpc_timeout_secs", "must be > 0"));
    }
    if config.ledger.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.receipt_timeout_secs", "must be > 0"));
    }
    if config.ledger.receipt_poll_ms == 0 {
        errors.push(ValidationError::new("ledger.receipt_poll_ms", "must be > 0"));
    }
    if let Some(probe) = &config.ledger.probe_contract {
        if probe.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                "ledger.probe_contract",
                format!("'{}' is not an address", probe),
            ));
        }
    }

    if config.gas.limit == 0 {
        errors.push(ValidationError::new("gas.limit", "must be > 0"));
    }

    if config.reconciler.interval_secs == 0 {
        errors.push(ValidationError::new("reconciler.interval_secs", "must be > 0"));
    }
    let startup = &config.reconciler.startup;
    if startup.base_delay_ms > startup.max_delay_ms {
        errors.push(ValidationError::new(
            "reconciler.startup",
            "base_delay_ms exceeds max_delay_ms",
        ));
    }

    if config.store.op_timeout_ms == 0 {
        errors.push(ValidationError::new("store.op_timeout_ms", "must be > 0"));
    }
    if config.store.ttl_secs == 0 {
        errors.push(ValidationError::new("store.ttl_secs", "must be > 0"));
    }
    if config.store.cas_max_attempts == 0 {
        errors.push(ValidationError::new("store.cas_max_attempts", "must be > 0"));
    }
    if config.store.purge_interval_secs == 0 {
        errors.push(ValidationError::new("store.purge_interval_secs", "must be > 0"));
    }

    if let Err(e) = SubscriptionAbi::from_config(&config.contracts.subscription) {
        errors.push(ValidationError::new("contracts.subscription", e.to_string()));
    }
    for file in &config.contracts.abi_files {
        if file.address.parse::<Address>().is_err() {
            errors.push(ValidationError::new(
                "contracts.abi_files",
                format!("{}: '{}' is not an address", file.name, file.address),
            ));
        }
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
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = RelayConfig::default();
        config.ledger.rpc_url = "not a url".to_string();
        config.gas.limit = 0;
        config.contracts.subscription.modify_status = "function (".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["ledger.rpc_url", "gas.limit", "contracts.subscription"]
        );
    }

    #[test]
    fn test_receipt_settings_must_be_positive() {
        let mut config = RelayConfig::default();
        config.ledger.receipt_poll_ms = 0;
        config.ledger.receipt_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["ledger.receipt_timeout_secs", "ledger.receipt_poll_ms"]);
    }

    #[test]
    fn test_purge_interval_must_be_positive() {
        let mut config = RelayConfig::default();
        config.store.purge_interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "store.purge_interval_secs");
    }

    #[test]
    fn test_probe_contract_must_be_address() {
        let mut config = RelayConfig::default();
        config.ledger.probe_contract = Some("0x1234".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "ledger.probe_contract");
    }
}
