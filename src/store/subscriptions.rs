//! Typed access to the relayer's keys.
//!
//! # Keys
//! - `subscriptionList{network}`: JSON array of [`Subscription`]
//! - `{address}sigs`: JSON array of lowercase addresses that proved ownership
//! - `deployedcontracts{network}` / `deployedsubcontracts{network}`: JSON arrays
//!
//! List mutations are read-modify-write loops over
//! [`KvStore::compare_and_set`], so concurrent add and remove never lose an
//! update. Every write refreshes the key's TTL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;

use crate::config::network::NetworkId;
use crate::config::schema::StoreConfig;
use crate::observability::metrics;
use crate::store::kv::{CasOutcome, KvStore, StoreError, StoreResult};
use crate::subscriptions::types::Subscription;

/// Which deployed-contract list to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    Contract,
    SubscriptionContract,
}

impl Deployment {
    fn prefix(&self) -> &'static str {
        match self {
            Deployment::Contract => "deployedcontracts",
            Deployment::SubscriptionContract => "deployedsubcontracts",
        }
    }
}

/// Store facade shared by the reconciler and the HTTP handlers.
#[derive(Clone)]
pub struct SubscriptionStore {
    kv: Arc<dyn KvStore>,
    network: NetworkId,
    ttl: Duration,
    op_timeout: Duration,
    cas_max_attempts: u32,
}

impl SubscriptionStore {
    pub fn new(kv: Arc<dyn KvStore>, network: NetworkId, config: &StoreConfig) -> Self {
        Self {
            kv,
            network,
            ttl: Duration::from_secs(config.ttl_secs),
            op_timeout: Duration::from_millis(config.op_timeout_ms),
            cas_max_attempts: config.cas_max_attempts.max(1),
        }
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn subscription_key(&self) -> String {
        format!("subscriptionList{}", self.network)
    }

    pub fn authorization_key(address: &str) -> String {
        format!("{}sigs", address.trim().to_lowercase())
    }

    pub fn deployment_key(&self, kind: Deployment) -> String {
        format!("{}{}", kind.prefix(), self.network)
    }

    /// All stored subscriptions. A missing or malformed list reads as empty.
    pub async fn subscriptions(&self) -> StoreResult<Vec<Subscription>> {
        let key = self.subscription_key();
        let list = self.read_list::<Subscription>(&key).await?.items;
        metrics::record_tracked_subscriptions(list.len());
        Ok(list)
    }

    /// Append `subscription` unless one with the same signature is stored.
    /// Returns whether it was added.
    pub async fn add_subscription(&self, subscription: Subscription) -> StoreResult<bool> {
        let key = self.subscription_key();
        let added = self
            .mutate::<Subscription, _, _>(&key, |list| {
                if list.iter().any(|s| s.is_identified_by(&subscription.signature)) {
                    return (false, false);
                }
                list.push(subscription.clone());
                (true, true)
            })
            .await?;

        if added {
            tracing::info!(
                contract = %subscription.subscription_contract,
                signature = %subscription.short_id(),
                "Subscription stored"
            );
        }
        Ok(added)
    }

    /// Remove every subscription with `signature`. Returns whether any was removed.
    pub async fn remove_subscription(&self, signature: &[u8]) -> StoreResult<bool> {
        let key = self.subscription_key();
        self.mutate::<Subscription, _, _>(&key, |list| {
            let before = list.len();
            list.retain(|s| !s.is_identified_by(signature));
            let removed = list.len() != before;
            (removed, removed)
        })
        .await
    }

    /// Empty the subscription list.
    pub async fn clear_subscriptions(&self) -> StoreResult<()> {
        let key = self.subscription_key();
        self.timed(self.kv.delete(&key)).await?;
        metrics::record_tracked_subscriptions(0);
        tracing::warn!(key = %key, "Subscription list cleared");
        Ok(())
    }

    /// Accounts that proved ownership for `address`.
    pub async fn authorizations(&self, address: &str) -> StoreResult<Vec<String>> {
        Ok(self.read_list(&Self::authorization_key(address)).await?.items)
    }

    /// Record that `account` proved ownership for `address`.
    pub async fn authorize(&self, address: &str, account: Address) -> StoreResult<Vec<String>> {
        let entry = account.to_string().to_lowercase();
        self.mutate::<String, _, _>(&Self::authorization_key(address), |list| {
            let changed = !list.contains(&entry);
            if changed {
                list.push(entry.clone());
            }
            (changed, list.clone())
        })
        .await
    }

    pub async fn deployments(&self, kind: Deployment) -> StoreResult<Vec<String>> {
        Ok(self.read_list(&self.deployment_key(kind)).await?.items)
    }

    /// Record a deployed contract address. Duplicates are ignored.
    pub async fn record_deployment(&self, kind: Deployment, address: &str) -> StoreResult<bool> {
        let address = address.trim().to_string();
        self.mutate::<String, _, _>(&self.deployment_key(kind), |list| {
            let changed = !list.iter().any(|a| a.eq_ignore_ascii_case(&address));
            if changed {
                list.push(address.clone());
            }
            (changed, changed)
        })
        .await
    }

    /// Read the list at `key` entry by entry.
    ///
    /// A missing or non-array document reads as empty. Entries that do not
    /// parse as `T` are logged and set aside so a write can keep them.
    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> StoreResult<StoredList<T>> {
        let Some(current) = self.timed(self.kv.get(key)).await? else {
            return Ok(StoredList::empty(None));
        };

        let raw = match serde_json::from_str::<Option<Vec<Value>>>(&current.value) {
            Ok(raw) => raw.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Malformed stored list, treating as empty");
                return Ok(StoredList::empty(Some(current.version)));
            }
        };

        let mut list = StoredList::empty(Some(current.version));
        for (index, entry) in raw.into_iter().enumerate() {
            match T::deserialize(&entry) {
                Ok(item) => list.items.push(item),
                Err(e) => {
                    tracing::warn!(key = %key, index, error = %e, "Skipping unreadable list entry");
                    list.unreadable.push(entry);
                }
            }
        }
        Ok(list)
    }

    /// Optimistic read-modify-write of the list at `key`.
    ///
    /// `apply` may run more than once and returns `(changed, result)`; an
    /// unchanged list is not written back. Unreadable entries are written
    /// back untouched after the parsed ones.
    async fn mutate<T, R, F>(&self, key: &str, mut apply: F) -> StoreResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut(&mut Vec<T>) -> (bool, R),
    {
        for attempt in 1..=self.cas_max_attempts {
            let StoredList {
                version,
                mut items,
                unreadable,
            } = self.read_list::<T>(key).await?;
            let (changed, result) = apply(&mut items);
            if !changed {
                return Ok(result);
            }

            let mut entries = items
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            entries.extend(unreadable);
            let value = serde_json::to_string(&entries)?;
            match self
                .timed(self.kv.compare_and_set(key, version, value, self.ttl))
                .await?
            {
                CasOutcome::Written { .. } => return Ok(result),
                CasOutcome::Conflict => {
                    tracing::debug!(key = %key, attempt, "Concurrent update, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }

        Err(StoreError::Contention {
            key: key.to_string(),
            attempts: self.cas_max_attempts,
        })
    }

    async fn timed<T>(&self, op: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        timeout(self.op_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout(self.op_timeout.as_millis() as u64))?
    }
}

/// A list as read from the store, with the version it was read at.
struct StoredList<T> {
    version: Option<u64>,
    items: Vec<T>,
    unreadable: Vec<Value>,
}

impl<T> StoredList<T> {
    fn empty(version: Option<u64>) -> Self {
        Self {
            version,
            items: Vec::new(),
            unreadable: Vec::new(),
        }
    }
}

impl std::fmt::Debug for SubscriptionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionStore")
            .field("network", &self.network)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryKvStore;
    use alloy::primitives::Bytes;
    use serde_json::json;

    fn store() -> (MemoryKvStore, SubscriptionStore) {
        let kv = MemoryKvStore::new(None);
        let store = SubscriptionStore::new(Arc::new(kv.clone()), NetworkId(4), &StoreConfig::default());
        (kv, store)
    }

    fn subscription(sig: u8) -> Subscription {
        Subscription {
            subscription_contract: Address::repeat_byte(0xaa),
            parts: vec![json!("0x70997970c51812dc3a010c7d01b50e0d17dc79c8"), json!(1)],
            signature: Bytes::from(vec![sig; 65]),
            subscription_hash: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_keys() {
        let (_, store) = store();
        assert_eq!(store.subscription_key(), "subscriptionList4");
        assert_eq!(store.deployment_key(Deployment::Contract), "deployedcontracts4");
        assert_eq!(
            store.deployment_key(Deployment::SubscriptionContract),
            "deployedsubcontracts4"
        );
        assert_eq!(SubscriptionStore::authorization_key("0xABc"), "0xabcsigs");
    }

    #[tokio::test]
    async fn test_add_remove() {
        let (kv, store) = store();
        assert!(store.subscriptions().await.unwrap().is_empty());

        assert!(store.add_subscription(subscription(1)).await.unwrap());
        assert!(store.add_subscription(subscription(2)).await.unwrap());
        // same signature is the same subscription
        assert!(!store.add_subscription(subscription(1)).await.unwrap());
        assert_eq!(store.subscriptions().await.unwrap().len(), 2);

        assert!(store.remove_subscription(&[1u8; 65]).await.unwrap());
        assert!(!store.remove_subscription(&[1u8; 65]).await.unwrap());
        let left = store.subscriptions().await.unwrap();
        assert_eq!(left, vec![subscription(2)]);

        store.clear_subscriptions().await.unwrap();
        assert!(store.subscriptions().await.unwrap().is_empty());
        assert!(kv.get("subscriptionList4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_list_reads_empty() {
        let (kv, store) = store();
        kv.set("subscriptionList4", "{not json".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.subscriptions().await.unwrap().is_empty());

        kv.set("subscriptionList4", "null".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(store.subscriptions().await.unwrap().is_empty());

        // a write over a malformed list starts fresh
        assert!(store.add_subscription(subscription(3)).await.unwrap());
        assert_eq!(store.subscriptions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_entry_does_not_hide_the_rest() {
        let (kv, store) = store();
        let mut bad = serde_json::to_value(subscription(9)).unwrap();
        bad["signature"] = json!("not-hex");
        let stored = json!([serde_json::to_value(subscription(1)).unwrap(), bad.clone()]);
        kv.set("subscriptionList4", stored.to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.subscriptions().await.unwrap(), vec![subscription(1)]);

        // writes keep both the readable entries and the unreadable one
        assert!(store.add_subscription(subscription(2)).await.unwrap());
        assert!(store.remove_subscription(&[1u8; 65]).await.unwrap());
        assert_eq!(store.subscriptions().await.unwrap(), vec![subscription(2)]);

        let raw: Vec<Value> =
            serde_json::from_str(&kv.get("subscriptionList4").await.unwrap().unwrap().value).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1], bad);
    }

    #[tokio::test]
    async fn test_authorizations_dedup_lowercase() {
        let (_, store) = store();
        let account: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap();

        let list = store.authorize("0xTarget", account).await.unwrap();
        assert_eq!(list, vec!["0x70997970c51812dc3a010c7d01b50e0d17dc79c8".to_string()]);
        let list = store.authorize("0xtarget", account).await.unwrap();
        assert_eq!(list.len(), 1);

        assert_eq!(store.authorizations("0xTARGET").await.unwrap(), list);
        assert!(store.authorizations("0xother").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deployments() {
        let (_, store) = store();
        assert!(store.record_deployment(Deployment::Contract, "0xAbC").await.unwrap());
        assert!(!store.record_deployment(Deployment::Contract, "0xabc").await.unwrap());
        assert!(store
            .record_deployment(Deployment::SubscriptionContract, "0xdef")
            .await
            .unwrap());

        assert_eq!(store.deployments(Deployment::Contract).await.unwrap(), vec!["0xAbC"]);
        assert_eq!(
            store.deployments(Deployment::SubscriptionContract).await.unwrap(),
            vec!["0xdef"]
        );
    }

    #[tokio::test]
    async fn test_networks_are_isolated() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new(None));
        let a = SubscriptionStore::new(kv.clone(), NetworkId(1), &StoreConfig::default());
        let b = SubscriptionStore::new(kv, NetworkId(2), &StoreConfig::default());

        a.add_subscription(subscription(1)).await.unwrap();
        assert_eq!(a.subscriptions().await.unwrap().len(), 1);
        assert!(b.subscriptions().await.unwrap().is_empty());
    }
}
