//! Intake of signed subscriptions and ownership proofs.

use std::sync::Arc;

use alloy::primitives::{Address, B256};
use serde::Deserialize;
use thiserror::Error;

use crate::ledger::client::Ledger;
use crate::ledger::signature;
use crate::ledger::types::LedgerError;
use crate::store::kv::StoreError;
use crate::store::subscriptions::SubscriptionStore;
use crate::subscriptions::types::Subscription;

/// Failures that say nothing about the request itself.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a subscription was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveRejection {
    /// `parts[0]` is not an address.
    MissingOwner,
    /// The client-supplied hash differs from the one the contract derives.
    HashMismatch { supplied: B256, derived: B256 },
    /// The signature does not recover to the owner.
    InvalidSignature { owner: Address },
}

impl std::fmt::Display for SaveRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveRejection::MissingOwner => f.write_str("parts[0] is not an owner address"),
            SaveRejection::HashMismatch { supplied, derived } => {
                write!(f, "subscription hash {} does not match derived {}", supplied, derived)
            }
            SaveRejection::InvalidSignature { owner } => {
                write!(f, "signature does not recover to owner {}", owner)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { hash: B256 },
    /// A subscription with the same signature is already stored.
    AlreadyStored { hash: B256 },
    Rejected(SaveRejection),
}

/// Body of an ownership proof: `sig` over `message` by `account`, recorded
/// against `address`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
    pub message: String,
    pub sig: String,
    pub account: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    Recorded { accounts: Vec<String> },
    InvalidSignature,
}

/// Validates client submissions before they reach the store.
#[derive(Clone)]
pub struct SubscriptionRegistry {
    ledger: Arc<dyn Ledger>,
    store: Arc<SubscriptionStore>,
}

impl SubscriptionRegistry {
    pub fn new(ledger: Arc<dyn Ledger>, store: Arc<SubscriptionStore>) -> Self {
        Self { ledger, store }
    }

    /// Verify and store a signed subscription.
    ///
    /// The hash is always re-derived on chain; the signature must recover to
    /// `parts[0]` over that hash.
    pub async fn save(&self, subscription: Subscription) -> Result<SaveOutcome, RegistryError> {
        let Some(owner) = subscription.owner() else {
            return Ok(SaveOutcome::Rejected(SaveRejection::MissingOwner));
        };

        let derived = self
            .ledger
            .subscription_hash(subscription.subscription_contract, &subscription.parts)
            .await?;

        if let Some(supplied) = subscription.subscription_hash {
            if supplied != derived {
                tracing::warn!(
                    contract = %subscription.subscription_contract,
                    supplied = %supplied,
                    derived = %derived,
                    "Subscription hash mismatch"
                );
                return Ok(SaveOutcome::Rejected(SaveRejection::HashMismatch { supplied, derived }));
            }
        }

        if !signature::verify_bytes(derived.as_slice(), &subscription.signature, owner) {
            tracing::warn!(
                contract = %subscription.subscription_contract,
                owner = %owner,
                "Subscription signature does not match owner"
            );
            return Ok(SaveOutcome::Rejected(SaveRejection::InvalidSignature { owner }));
        }

        let mut subscription = subscription;
        subscription.subscription_hash = Some(derived);
        if self.store.add_subscription(subscription).await? {
            Ok(SaveOutcome::Saved { hash: derived })
        } else {
            Ok(SaveOutcome::AlreadyStored { hash: derived })
        }
    }

    /// Record `account` against `address` when `sig` proves it signed `message`.
    pub async fn authorize(&self, request: &AuthorizationRequest) -> Result<AuthorizeOutcome, StoreError> {
        let Ok(account) = request.account.trim().to_lowercase().parse::<Address>() else {
            return Ok(AuthorizeOutcome::InvalidSignature);
        };
        if !signature::verify(&request.message, &request.sig, &request.account) {
            tracing::warn!(account = %account, "Ownership proof rejected");
            return Ok(AuthorizeOutcome::InvalidSignature);
        }

        let accounts = self.store.authorize(&request.address, account).await?;
        tracing::info!(account = %account, address = %request.address, "Ownership proof recorded");
        Ok(AuthorizeOutcome::Recorded { accounts })
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry").field("store", &self.store).finish()
    }
}
