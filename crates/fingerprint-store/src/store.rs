use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use element_relocator::Fingerprint;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{FingerprintCodec, PersistedEntry};
use crate::errors::StoreError;

/// Caller-defined element identity, e.g. page + selector + ordinal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementKey(String);

impl ElementKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn compose(page: &str, selector: &str, ordinal: usize) -> Self {
        Self(format!("{page}|{selector}|{ordinal}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ElementKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[derive(Clone, Debug)]
pub struct StoreEntry {
    pub fingerprint: Arc<Fingerprint>,
    pub last_used: DateTime<Utc>,
}

/// Bounded LRU map from [`ElementKey`] to [`Fingerprint`].
pub struct FingerprintStore {
    inner: Mutex<LruCache<ElementKey, StoreEntry>>,
}

impl FingerprintStore {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Fetch and mark as most recently used.
    pub fn get(&self, key: &ElementKey) -> Option<Arc<Fingerprint>> {
        let mut guard = self.inner.lock();
        let entry = guard.get_mut(key)?;
        entry.last_used = Utc::now();
        Some(Arc::clone(&entry.fingerprint))
    }

    /// Fetch without touching recency.
    pub fn peek(&self, key: &ElementKey) -> Option<Arc<Fingerprint>> {
        self.inner
            .lock()
            .peek(key)
            .map(|entry| Arc::clone(&entry.fingerprint))
    }

    pub fn contains(&self, key: &ElementKey) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn last_used(&self, key: &ElementKey) -> Option<DateTime<Utc>> {
        self.inner.lock().peek(key).map(|entry| entry.last_used)
    }

    /// Insert or overwrite. Returns the fingerprint previously stored under
    /// `key`, if any.
    pub fn put(&self, key: ElementKey, fingerprint: Fingerprint) -> Option<Arc<Fingerprint>> {
        self.insert_entry(
            key,
            StoreEntry {
                fingerprint: Arc::new(fingerprint),
                last_used: Utc::now(),
            },
        )
    }

    fn insert_entry(&self, key: ElementKey, entry: StoreEntry) -> Option<Arc<Fingerprint>> {
        let displaced = self.inner.lock().push(key.clone(), entry)?;
        if displaced.0 == key {
            return Some(displaced.1.fingerprint);
        }
        debug!(evicted = %displaced.0, inserted = %key, "fingerprint store at capacity");
        None
    }

    pub fn evict(&self, key: &ElementKey) -> Option<Arc<Fingerprint>> {
        self.inner.lock().pop(key).map(|entry| entry.fingerprint)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<ElementKey> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    /// Entries from least to most recently used.
    pub fn entries(&self) -> Vec<(ElementKey, StoreEntry)> {
        let guard = self.inner.lock();
        // lru iterates most recent first
        let mut entries: Vec<(ElementKey, StoreEntry)> = guard
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        entries.reverse();
        entries
    }

    /// Encode every entry, least recently used first. Encoding happens
    /// outside the lock.
    pub fn export(&self, codec: &dyn FingerprintCodec) -> Result<Vec<PersistedEntry>, StoreError> {
        self.entries()
            .into_iter()
            .map(|(key, entry)| -> Result<PersistedEntry, StoreError> {
                Ok(PersistedEntry {
                    payload: codec.encode(&entry.fingerprint)?,
                    last_used: entry.last_used,
                    key,
                })
            })
            .collect()
    }

    /// Replay exported entries in order, preserving their recency and
    /// timestamps. Nothing is inserted if any payload fails to decode.
    pub fn import(
        &self,
        codec: &dyn FingerprintCodec,
        entries: Vec<PersistedEntry>,
    ) -> Result<usize, StoreError> {
        let decoded = entries
            .into_iter()
            .map(|persisted| -> Result<(ElementKey, StoreEntry), StoreError> {
                let fingerprint =
                    codec
                        .decode(&persisted.payload)
                        .map_err(|err| StoreError::Decode {
                            key: persisted.key.to_string(),
                            reason: err.to_string(),
                        })?;
                Ok((
                    persisted.key,
                    StoreEntry {
                        fingerprint: Arc::new(fingerprint),
                        last_used: persisted.last_used,
                    },
                ))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let count = decoded.len();
        for (key, entry) in decoded {
            self.insert_entry(key, entry);
        }
        debug!(count, "imported fingerprints");
        Ok(count)
    }
}

impl Default for FingerprintStore {
    fn default() -> Self {
        Self::with_config(&StoreConfig::default())
    }
}

impl fmt::Debug for FingerprintStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        f.debug_struct("FingerprintStore")
            .field("len", &guard.len())
            .field("capacity", &guard.cap())
            .finish()
    }
}
