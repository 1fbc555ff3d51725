//! Call shapes for the subscription contract.
//!
//! Subscription and meta-transaction `parts` are opaque to the relayer: each
//! configured Solidity signature decides how the parts are ABI-encoded, by
//! position. JSON strings, numbers and booleans are coerced to the declared
//! parameter types.

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::Function;
use alloy::primitives::{Address, Bytes, B256};
use serde_json::Value;

use crate::config::schema::SubscriptionAbiConfig;
use crate::ledger::types::{LedgerError, LedgerResult, SubscriptionStatus};

/// One parsed contract method.
#[derive(Debug, Clone)]
pub struct CallShape {
    function: Function,
}

impl CallShape {
    /// Parse a signature such as `function foo(address a, uint256 b) view returns (bool)`.
    pub fn parse(signature: &str) -> LedgerResult<Self> {
        let function = Function::parse(signature)
            .map_err(|e| LedgerError::Abi(format!("'{}': {}", signature, e)))?;
        Ok(Self { function })
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Number of inputs, including a trailing signature parameter if any.
    pub fn arity(&self) -> usize {
        self.function.inputs.len()
    }

    /// Encode calldata (selector included) from `parts` and an optional trailing signature.
    pub fn encode(&self, parts: &[Value], signature: Option<&[u8]>) -> LedgerResult<Bytes> {
        let supplied = parts.len() + usize::from(signature.is_some());
        if supplied != self.arity() {
            return Err(LedgerError::Encoding(format!(
                "{} takes {} arguments, got {}",
                self.name(),
                self.arity(),
                supplied
            )));
        }

        let mut values = Vec::with_capacity(supplied);
        for (index, (param, part)) in self.function.inputs.iter().zip(parts).enumerate() {
            let ty = param
                .resolve()
                .map_err(|e| LedgerError::Abi(format!("{}: {}", self.name(), e)))?;
            let value = coerce_part(&ty, part).map_err(|e| {
                LedgerError::Encoding(format!("{} part {}: {}", self.name(), index, e))
            })?;
            values.push(value);
        }
        if let Some(signature) = signature {
            values.push(DynSolValue::Bytes(signature.to_vec()));
        }

        let data = self
            .function
            .abi_encode_input(&values)
            .map_err(|e| LedgerError::Encoding(format!("{}: {}", self.name(), e)))?;
        Ok(Bytes::from(data))
    }

    /// Decode the first return value.
    pub fn decode_output(&self, data: &[u8]) -> LedgerResult<DynSolValue> {
        let mut values = self
            .function
            .abi_decode_output(data)
            .map_err(|e| LedgerError::Decoding(format!("{}: {}", self.name(), e)))?;
        if values.is_empty() {
            return Err(LedgerError::Decoding(format!("{} returned nothing", self.name())));
        }
        Ok(values.swap_remove(0))
    }

    pub fn decode_b256(&self, data: &[u8]) -> LedgerResult<B256> {
        match self.decode_output(data)? {
            DynSolValue::FixedBytes(word, 32) => Ok(word),
            other => Err(self.unexpected("bytes32", &other)),
        }
    }

    pub fn decode_bool(&self, data: &[u8]) -> LedgerResult<bool> {
        let value = self.decode_output(data)?;
        value.as_bool().ok_or_else(|| self.unexpected("bool", &value))
    }

    pub fn decode_address(&self, data: &[u8]) -> LedgerResult<Address> {
        let value = self.decode_output(data)?;
        value.as_address().ok_or_else(|| self.unexpected("address", &value))
    }

    pub fn decode_status(&self, data: &[u8]) -> LedgerResult<SubscriptionStatus> {
        let value = self.decode_output(data)?;
        let (raw, _) = value.as_uint().ok_or_else(|| self.unexpected("uint", &value))?;
        if raw > alloy::primitives::U256::from(u8::MAX) {
            return Ok(SubscriptionStatus::Unknown(u8::MAX));
        }
        Ok(SubscriptionStatus::from(raw.to::<u8>()))
    }

    fn unexpected(&self, wanted: &str, got: &DynSolValue) -> LedgerError {
        LedgerError::Decoding(format!("{} returned {:?}, expected {}", self.name(), got, wanted))
    }
}

fn coerce_part(ty: &DynSolType, part: &Value) -> Result<DynSolValue, String> {
    let text = match part {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => return Err(format!("unsupported value {}", other)),
    };
    ty.coerce_str(&text).map_err(|e| e.to_string())
}

/// Every call the relayer makes against a subscription contract.
#[derive(Debug, Clone)]
pub struct SubscriptionAbi {
    pub author: CallShape,
    pub subscription_hash: CallShape,
    pub subscription_status: CallShape,
    pub subscription_ready: CallShape,
    pub execute_subscription: CallShape,
    pub modify_status_hash: CallShape,
    pub valid_modify_status_signer: CallShape,
    pub modify_status: CallShape,
}

impl SubscriptionAbi {
    pub fn from_config(config: &SubscriptionAbiConfig) -> LedgerResult<Self> {
        Ok(Self {
            author: CallShape::parse(&config.author)?,
            subscription_hash: CallShape::parse(&config.subscription_hash)?,
            subscription_status: CallShape::parse(&config.subscription_status)?,
            subscription_ready: CallShape::parse(&config.subscription_ready)?,
            execute_subscription: CallShape::parse(&config.execute_subscription)?,
            modify_status_hash: CallShape::parse(&config.modify_status_hash)?,
            valid_modify_status_signer: CallShape::parse(&config.valid_modify_status_signer)?,
            modify_status: CallShape::parse(&config.modify_status)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use serde_json::json;

    fn abi() -> SubscriptionAbi {
        SubscriptionAbi::from_config(&SubscriptionAbiConfig::default()).unwrap()
    }

    fn parts() -> Vec<Value> {
        vec![
            json!("0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1"),
            json!("0xffcf8fdee72ac11b5c542428b35eef5769c409f0"),
            json!("0x22d491bde2303f2f43325b2108d26f1eaba1e32b"),
            json!("1000000000000000000"),
            json!(2592000),
            json!("0x0000000000000000000000000000000000000000"),
            json!("0"),
            json!("0x0000000000000000000000000000000000000000"),
            json!(1),
        ]
    }

    #[test]
    fn test_default_shapes_parse() {
        let abi = abi();
        assert_eq!(abi.subscription_hash.arity(), 9);
        assert_eq!(abi.execute_subscription.arity(), 10);
        assert_eq!(abi.valid_modify_status_signer.arity(), 3);
        assert_eq!(abi.author.arity(), 0);
    }

    #[test]
    fn test_encode_includes_selector() {
        let abi = abi();
        let data = abi.subscription_hash.encode(&parts(), None).unwrap();
        // selector + 9 static words
        assert_eq!(data.len(), 4 + 9 * 32);
        assert_eq!(&data[..4], abi.subscription_hash.function.selector().as_slice());
    }

    #[test]
    fn test_encode_with_signature() {
        let abi = abi();
        let signature = [0x11u8; 65];
        let data = abi
            .execute_subscription
            .encode(&parts(), Some(&signature))
            .unwrap();
        assert_eq!(&data[..4], abi.execute_subscription.function.selector().as_slice());
        assert!(data.len() > 4 + 10 * 32);
    }

    #[test]
    fn test_arity_mismatch() {
        let abi = abi();
        let err = abi.subscription_hash.encode(&parts()[..8], None).unwrap_err();
        assert!(matches!(err, LedgerError::Encoding(_)));
        assert!(err.to_string().contains("takes 9 arguments, got 8"));
    }

    #[test]
    fn test_uncoercible_part() {
        let abi = abi();
        let mut bad = parts();
        bad[0] = json!("not-an-address");
        let err = abi.subscription_hash.encode(&bad, None).unwrap_err();
        assert!(err.to_string().contains("part 0"));

        bad[0] = json!({"nested": true});
        assert!(abi.subscription_hash.encode(&bad, None).is_err());
    }

    #[test]
    fn test_decode_outputs() {
        let abi = abi();

        let word = B256::repeat_byte(0xab);
        assert_eq!(abi.subscription_hash.decode_b256(word.as_slice()).unwrap(), word);

        let status = DynSolValue::Uint(U256::from(3u8), 8).abi_encode();
        assert_eq!(
            abi.subscription_status.decode_status(&status).unwrap(),
            SubscriptionStatus::Expired
        );

        let ready = DynSolValue::Bool(true).abi_encode();
        assert!(abi.subscription_ready.decode_bool(&ready).unwrap());

        assert!(abi.subscription_ready.decode_bool(&[]).is_err());
    }

    #[test]
    fn test_bad_signature_rejected() {
        assert!(matches!(
            CallShape::parse("function broken(").unwrap_err(),
            LedgerError::Abi(_)
        ));
    }
}
