//! Meta-transaction relay against a scripted ledger.

mod common;

use std::sync::atomic::Ordering;

use alloy::primitives::{Bytes, B256};
use common::*;
use subscription_relayer::relay::{MetaTransaction, RejectReason, RelayDispatcher, RelayError, RelayOutcome};

fn meta(signature: &[u8]) -> MetaTransaction {
    MetaTransaction {
        subscription_contract: contract(),
        parts: modify_status_parts(B256::repeat_byte(0x42), 2),
        signature: Bytes::copy_from_slice(signature),
        modify_status_hash: None,
    }
}

fn dispatcher(ledger: std::sync::Arc<MockLedger>) -> RelayDispatcher {
    RelayDispatcher::new(ledger.clone(), submitter(ledger))
}

#[tokio::test]
async fn test_valid_meta_transaction_is_broadcast() {
    let ledger = MockLedger::new();
    ledger.accept_modify_signature(&[0x5a; 65]);
    let request = meta(&[0x5a; 65]);
    let expected_hash = MockLedger::modify_status_hash_of(&request.parts);

    let outcome = dispatcher(ledger.clone()).relay(request).await.unwrap();

    let sent = ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        outcome,
        RelayOutcome::Accepted {
            hash: expected_hash,
            tx_hash: sent[0].tx_hash
        }
    );
    assert_eq!(sent[0].to, Some(contract()));
    assert_eq!(sent[0].from, Some(operator()));
    let expected = abi()
        .modify_status
        .encode(&modify_status_parts(B256::repeat_byte(0x42), 2), Some(&[0x5a; 65]))
        .unwrap();
    assert_eq!(sent[0].input, expected);
}

#[tokio::test]
async fn test_invalid_signer_is_rejected_without_broadcast() {
    let ledger = MockLedger::new();

    let outcome = dispatcher(ledger.clone()).relay(meta(&[0x11; 65])).await.unwrap();

    assert_eq!(outcome, RelayOutcome::Rejected(RejectReason::InvalidSigner));
    assert!(ledger.sent().is_empty());
}

#[tokio::test]
async fn test_supplied_hash_must_match() {
    let ledger = MockLedger::new();
    ledger.accept_modify_signature(&[0x5a; 65]);
    let mut request = meta(&[0x5a; 65]);
    let derived = MockLedger::modify_status_hash_of(&request.parts);
    request.modify_status_hash = Some(B256::repeat_byte(0xee));

    let outcome = dispatcher(ledger.clone()).relay(request.clone()).await.unwrap();
    assert_eq!(
        outcome,
        RelayOutcome::Rejected(RejectReason::HashMismatch {
            supplied: B256::repeat_byte(0xee),
            derived
        })
    );
    assert!(ledger.sent().is_empty());

    // a matching hash goes through
    request.modify_status_hash = Some(derived);
    let outcome = dispatcher(ledger.clone()).relay(request).await.unwrap();
    assert!(matches!(outcome, RelayOutcome::Accepted { .. }));
}

#[tokio::test]
async fn test_unreachable_ledger_is_a_verification_failure() {
    let ledger = MockLedger::new();
    ledger.accept_modify_signature(&[0x5a; 65]);
    ledger.down.store(true, Ordering::SeqCst);

    let err = dispatcher(ledger.clone()).relay(meta(&[0x5a; 65])).await.unwrap_err();

    assert!(matches!(err, RelayError::Verification(_)));
    assert!(ledger.sent().is_empty());
}

#[tokio::test]
async fn test_rejected_broadcast_is_reported_separately() {
    let ledger = MockLedger::new();
    ledger.accept_modify_signature(&[0x5a; 65]);
    ledger.fail_send.store(true, Ordering::SeqCst);

    let err = dispatcher(ledger.clone()).relay(meta(&[0x5a; 65])).await.unwrap_err();

    assert!(matches!(err, RelayError::Broadcast(_)));
    assert!(err.to_string().contains("insufficient funds"));
}
