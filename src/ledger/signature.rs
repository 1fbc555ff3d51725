//! Personal-message signature recovery.
//!
//! Messages are hashed with the Ethereum signed-message prefix before
//! recovery. A message given as text that is strict `0x` hex is treated as the
//! bytes it encodes, anything else as UTF-8, the same way web3 wallets sign.
//! None of these functions panic on malformed input.

use alloy::primitives::{hex, Address, Signature};

/// The bytes a wallet signs for `message`.
pub fn message_bytes(message: &str) -> Vec<u8> {
    if let Some(digits) = message.strip_prefix("0x").or_else(|| message.strip_prefix("0X")) {
        if let Ok(bytes) = hex::decode(digits) {
            return bytes;
        }
    }
    message.as_bytes().to_vec()
}

/// Recover the signer of `message` from a 65-byte `signature`.
pub fn recover(message: &[u8], signature: &[u8]) -> Option<Address> {
    let signature = Signature::try_from(signature).ok()?;
    signature.recover_address_from_msg(message).ok()
}

/// True iff `signature` over `message` recovers to `expected`.
pub fn verify_bytes(message: &[u8], signature: &[u8], expected: Address) -> bool {
    recover(message, signature) == Some(expected)
}

/// Textual form of [`verify_bytes`]. Address comparison is case-insensitive;
/// an unparsable signature or address yields `false`.
pub fn verify(message: &str, signature: &str, expected: &str) -> bool {
    let Ok(signature) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(expected) = expected.trim().to_lowercase().parse::<Address>() else {
        return false;
    };
    verify_bytes(&message_bytes(message), &signature, expected)
}
