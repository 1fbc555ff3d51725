//! In-process key/value store with TTLs and JSON snapshot persistence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::store::kv::{CasOutcome, KvStore, StoreResult, Versioned};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    version: u64,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// On-disk form of an entry. Expiry is stored as remaining seconds.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    value: String,
    ttl_secs: u64,
}

/// A concurrent TTL map. Conditional writes hold the key's shard lock, so a
/// version check and the write that follows it are atomic.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<DashMap<String, Entry>>,
    versions: Arc<AtomicU64>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryKvStore {
    /// Create a new empty store.
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            versions: Arc::new(AtomicU64::new(0)),
            snapshot_path,
        }
    }

    /// Load from a snapshot file if it exists.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_path_buf()));
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let entries: HashMap<String, SnapshotEntry> = serde_json::from_reader(reader)?;

            let now = Instant::now();
            for (key, entry) in entries {
                if entry.ttl_secs == 0 {
                    continue;
                }
                let version = store.next_version();
                store.inner.insert(
                    key,
                    Entry {
                        value: entry.value,
                        version,
                        expires_at: now + Duration::from_secs(entry.ttl_secs),
                    },
                );
            }
            tracing::info!(path = %path.display(), keys = store.inner.len(), "Loaded store snapshot");
        }
        Ok(store)
    }

    /// Write live entries to the snapshot file, if one is configured.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let now = Instant::now();
        let entries: HashMap<String, SnapshotEntry> = self
            .inner
            .iter()
            .filter(|r| r.value().is_live(now))
            .map(|r| {
                let entry = r.value();
                (
                    r.key().clone(),
                    SnapshotEntry {
                        value: entry.value.clone(),
                        ttl_secs: entry.expires_at.saturating_duration_since(now).as_secs(),
                    },
                )
            })
            .collect();

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &entries)?;
        tracing::info!(path = %path.display(), keys = entries.len(), "Saved store snapshot");
        Ok(())
    }

    /// Drop expired keys, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.inner.len())
    }

    /// Sweep expired keys every `every` until shutdown.
    pub async fn run_purge(&self, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, "Purged expired keys");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Store purge received shutdown signal");
                    break;
                }
            }
        }
    }

    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn entry(&self, value: String, ttl: Duration) -> Entry {
        Entry {
            value,
            version: self.next_version(),
            expires_at: Instant::now() + ttl,
        }
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Versioned>> {
        let now = Instant::now();
        self.inner.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(self.inner.get(key).map(|r| Versioned {
            value: r.value.clone(),
            version: r.version,
        }))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> StoreResult<u64> {
        let entry = self.entry(value, ttl);
        let version = entry.version;
        self.inner.insert(key.to_string(), entry);
        Ok(version)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: String,
        ttl: Duration,
    ) -> StoreResult<CasOutcome> {
        let now = Instant::now();
        match self.inner.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                let current = Some(occupied.get())
                    .filter(|entry| entry.is_live(now))
                    .map(|entry| entry.version);
                if current != expected {
                    return Ok(CasOutcome::Conflict);
                }
                let entry = self.entry(value, ttl);
                let version = entry.version;
                occupied.insert(entry);
                Ok(CasOutcome::Written { version })
            }
            MapEntry::Vacant(vacant) => {
                if expected.is_some() {
                    return Ok(CasOutcome::Conflict);
                }
                let entry = self.entry(value, ttl);
                let version = entry.version;
                vacant.insert(entry);
                Ok(CasOutcome::Written { version })
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.remove(key);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKvStore")
            .field("keys", &self.inner.len())
            .field("snapshot_path", &self.snapshot_path)
            .finish()
    }
}
