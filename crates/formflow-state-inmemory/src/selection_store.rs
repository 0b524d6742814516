use async_trait::async_trait;
use formflow_core::{FormError, SelectionStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// A value with optional expiration time
#[derive(Debug, Clone)]
struct ValueWithExpiry {
    value: String,
    expires_at: Option<Instant>,
}

impl ValueWithExpiry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// In-memory implementation of [`SelectionStore`].
///
/// Clones share the same storage. With a TTL, selections older than the TTL
/// read as absent.
#[derive(Debug, Clone, Default)]
pub struct InMemorySelectionStore {
    entries: Arc<RwLock<HashMap<String, ValueWithExpiry>>>,
    ttl: Option<Duration>,
}

impl InMemorySelectionStore {
    /// Create an empty store whose entries never expire
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose entries expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::default(),
            ttl: Some(ttl),
        }
    }

    /// Create a store pre-populated with selections
    pub fn seeded<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| {
                (
                    k.into(),
                    ValueWithExpiry {
                        value: v.into(),
                        expires_at: None,
                    },
                )
            })
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
            ttl: None,
        }
    }

    /// Remove a selection, returning whether it existed
    pub async fn remove(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Forget every selection
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of live (unexpired) selections
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SelectionStore for InMemorySelectionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FormError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                debug!("Selection expired: key={}", key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), FormError> {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        self.entries.write().await.insert(
            key.to_string(),
            ValueWithExpiry {
                value: value.to_string(),
                expires_at,
            },
        );

        debug!("Stored selection: key={}", key);
        Ok(())
    }
}
