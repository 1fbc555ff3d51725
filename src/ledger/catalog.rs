//! ABI documents for deployed contracts, looked up by address.

use std::fs;

use alloy::primitives::Address;
use serde_json::Value;

use crate::config::schema::AbiFileConfig;
use crate::ledger::types::{LedgerError, LedgerResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiEntry {
    pub name: String,
    pub address: Address,
    /// The ABI array, serialized compactly.
    pub abi: String,
}

/// Known contract ABIs.
#[derive(Debug, Clone, Default)]
pub struct AbiCatalog {
    entries: Vec<AbiEntry>,
}

impl AbiCatalog {
    pub fn new(entries: Vec<AbiEntry>) -> Self {
        Self { entries }
    }

    /// Read every configured ABI file.
    ///
    /// A file may hold the ABI array itself or a build artifact with an
    /// `abi` field.
    pub fn load(files: &[AbiFileConfig]) -> LedgerResult<Self> {
        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let raw = fs::read_to_string(&file.path)
                .map_err(|e| LedgerError::Abi(format!("{}: {}", file.path, e)))?;
            let address = file
                .address
                .trim()
                .to_lowercase()
                .parse::<Address>()
                .map_err(|e| LedgerError::Abi(format!("{}: {}", file.name, e)))?;
            let abi = extract_abi(&raw).map_err(|e| LedgerError::Abi(format!("{}: {}", file.path, e)))?;

            tracing::debug!(name = %file.name, address = %address, "Loaded contract ABI");
            entries.push(AbiEntry {
                name: file.name.clone(),
                address,
                abi,
            });
        }
        Ok(Self { entries })
    }

    /// Case-insensitive lookup. Unparsable addresses match nothing.
    pub fn lookup(&self, address: &str) -> Option<&AbiEntry> {
        let address = address.trim().to_lowercase().parse::<Address>().ok()?;
        self.entries.iter().find(|entry| entry.address == address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn extract_abi(raw: &str) -> Result<String, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let abi = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut artifact) => match artifact.remove("abi") {
            Some(abi @ Value::Array(_)) => abi,
            _ => return Err("no abi array".to_string()),
        },
        _ => return Err("expected an abi array".to_string()),
    };
    Ok(abi.to_string())
}
