//! Transaction submission and receipt observation.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use alloy::primitives::{Bytes, B256};
use common::*;
use subscription_relayer::config::schema::GasConfig;
use subscription_relayer::ledger::{
    CallKind, ContractCall, ReceiptOutcome, ReceiptPolicy, SubmissionEvent, TxSubmitter,
};

fn execute_call() -> ContractCall {
    signed_subscription(&owner(), 7).execute_call()
}

#[tokio::test]
async fn test_submit_uses_operator_and_fixed_gas() {
    let ledger = MockLedger::new();
    let submitter = submitter(ledger.clone());

    let pending = submitter.submit(execute_call()).await.unwrap();

    assert_eq!(pending.kind(), CallKind::ExecuteSubscription);
    assert_eq!(pending.contract(), contract());
    let sent = ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tx_hash, pending.tx_hash());
    assert_eq!(sent[0].from, Some(operator()));
    assert_eq!(sent[0].gas, Some(1_000_000));
    assert_eq!(sent[0].gas_price, Some(4_000_000_000));
}

#[tokio::test]
async fn test_confirmation_reports_inclusion() {
    let ledger = MockLedger::new();
    let submitter = submitter(ledger.clone());
    let mut events = submitter.subscribe();

    let pending = submitter.submit(execute_call()).await.unwrap();
    let tx_hash = pending.tx_hash();

    match pending.confirmation().await {
        ReceiptOutcome::Included(receipt) => {
            assert_eq!(receipt.tx_hash, tx_hash);
            assert_eq!(receipt.block_number, Some(1));
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    assert_eq!(
        events.recv().await.unwrap(),
        SubmissionEvent::HashKnown {
            kind: CallKind::ExecuteSubscription,
            contract: contract(),
            tx_hash,
        }
    );
    assert!(matches!(
        events.recv().await.unwrap(),
        SubmissionEvent::ReceiptKnown { kind: CallKind::ExecuteSubscription, .. }
    ));
}

#[tokio::test]
async fn test_zero_poll_interval_still_confirms() {
    let ledger = MockLedger::new();
    let submitter = TxSubmitter::new(
        ledger,
        abi(),
        GasConfig::default(),
        ReceiptPolicy {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::ZERO,
        },
    );
    let mut events = submitter.subscribe();

    let pending = submitter.submit(execute_call()).await.unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(2), pending.confirmation())
        .await
        .unwrap();

    assert!(matches!(outcome, ReceiptOutcome::Included(_)));
    assert!(matches!(events.recv().await.unwrap(), SubmissionEvent::HashKnown { .. }));
    assert!(matches!(events.recv().await.unwrap(), SubmissionEvent::ReceiptKnown { .. }));
}

#[tokio::test]
async fn test_missing_receipt_times_out() {
    let ledger = MockLedger::new();
    ledger.withhold_receipts.store(true, Ordering::SeqCst);
    let submitter = submitter(ledger.clone());
    let mut events = submitter.subscribe();

    let pending = submitter.submit(execute_call()).await.unwrap();
    let tx_hash = pending.tx_hash();

    let outcome = tokio::time::timeout(Duration::from_secs(2), pending.confirmation())
        .await
        .unwrap();
    assert_eq!(outcome, ReceiptOutcome::TimedOut);

    assert!(matches!(events.recv().await.unwrap(), SubmissionEvent::HashKnown { .. }));
    assert_eq!(
        events.recv().await.unwrap(),
        SubmissionEvent::ReceiptTimedOut {
            kind: CallKind::ExecuteSubscription,
            tx_hash,
        }
    );
}

#[tokio::test]
async fn test_broadcast_failure_is_published_and_returned() {
    let ledger = MockLedger::new();
    ledger.fail_send.store(true, Ordering::SeqCst);
    let submitter = submitter(ledger.clone());
    let mut events = submitter.subscribe();

    let err = submitter.submit(execute_call()).await.unwrap_err();
    assert!(err.is_transient());

    match events.recv().await.unwrap() {
        SubmissionEvent::BroadcastFailed { kind, contract: to, error } => {
            assert_eq!(kind, CallKind::ExecuteSubscription);
            assert_eq!(to, contract());
            assert!(error.contains("insufficient funds"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_unencodable_call_never_reaches_the_node() {
    let ledger = MockLedger::new();
    let submitter = submitter(ledger.clone());

    let call = ContractCall {
        kind: CallKind::ModifyStatus,
        contract: contract(),
        parts: modify_status_parts(B256::ZERO, 1)[..1].to_vec(),
        signature: Bytes::from_static(&[0x01; 65]),
    };
    let err = submitter.submit(call).await.unwrap_err();

    assert!(!err.is_transient());
    assert!(ledger.sent().is_empty());
}
