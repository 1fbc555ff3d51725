//! Deploy network identification.
//!
//! The network id selects the store keys every component shares, so the
//! process refuses to start without one.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::loader::ConfigError;

/// Network id for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkId(pub u64);

impl From<u64> for NetworkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read the network id from `path`. Missing, unparsable and zero ids are errors.
pub fn read_network_id(path: &Path) -> Result<NetworkId, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| ConfigError::Network(format!("{}: {}", path.display(), e)))?;
    parse_network_id(&raw)
}

fn parse_network_id(raw: &str) -> Result<NetworkId, ConfigError> {
    let trimmed = raw.trim();
    match trimmed.parse::<u64>() {
        Ok(0) => Err(ConfigError::Network("network id is zero".to_string())),
        Ok(id) => Ok(NetworkId(id)),
        Err(_) => Err(ConfigError::Network(format!("'{}' is not a network id", trimmed))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_network_id() {
        assert_eq!(parse_network_id("4\n").unwrap(), NetworkId(4));
        assert_eq!(parse_network_id("  1337 ").unwrap(), NetworkId(1337));
    }

    #[test]
    fn test_zero_and_garbage_rejected() {
        assert!(parse_network_id("0").is_err());
        assert!(parse_network_id("").is_err());
        assert!(parse_network_id("mainnet").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = read_network_id(Path::new("no-such-deploy.network")).unwrap_err();
        assert!(err.to_string().contains("no-such-deploy.network"));
    }
}
