//! In-memory storage backend.
//!
//! Stores all data in a `BTreeMap` behind a `RwLock`. Nothing survives the
//! process. Used by unit and integration tests, and by the server when no
//! persistent store is configured.
//!
//! An optional byte quota mirrors the browser's local-storage limit: once the
//! stored keys and values would exceed it, writes fail with
//! [`StorageError::Unavailable`].

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{BatchOp, StorageBackend, StorageError};

/// An in-memory storage backend backed by a `BTreeMap`.
///
/// Clones share the same underlying map.
///
/// # Examples
///
/// ```
/// # use dsecure_storage::{MemoryBackend, StorageBackend};
/// # #[tokio::main]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// backend.put("reactions/nist-800-88/likes", b"1").await.unwrap();
/// let val = backend.get("reactions/nist-800-88/likes").await.unwrap();
/// assert_eq!(val, Some(b"1".to_vec()));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend with no quota.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            quota_bytes: None,
        }
    }

    /// Create a backend that rejects writes once keys plus values would
    /// exceed `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether the backend holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn used_bytes(data: &BTreeMap<String, Vec<u8>>) -> usize {
    data.iter().map(|(k, v)| k.len().saturating_add(v.len())).sum()
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        if let Some(quota) = self.quota_bytes {
            let replaced = data
                .get(key)
                .map_or(0, |old| key.len().saturating_add(old.len()));
            let projected = used_bytes(&data)
                .saturating_sub(replaced)
                .saturating_add(key.len())
                .saturating_add(value.len());
            if projected > quota {
                return Err(StorageError::Unavailable {
                    reason: format!("quota of {quota} bytes exceeded writing '{key}'"),
                });
            }
        }
        data.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        data.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        let keys = data
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let data = self.data.read().await;
        Ok(data.contains_key(key))
    }

    async fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        if let Some(quota) = self.quota_bytes {
            // Final value per key after the whole batch.
            let mut staged: BTreeMap<&str, Option<&[u8]>> = BTreeMap::new();
            for op in &ops {
                let value = match op {
                    BatchOp::Put { value, .. } => Some(value.as_slice()),
                    BatchOp::Delete { .. } => None,
                };
                staged.insert(op.key(), value);
            }
            let mut projected = used_bytes(&data);
            for (key, value) in &staged {
                if let Some(old) = data.get(*key) {
                    projected = projected.saturating_sub(key.len().saturating_add(old.len()));
                }
                if let Some(value) = value {
                    projected = projected.saturating_add(key.len().saturating_add(value.len()));
                }
            }
            if projected > quota {
                return Err(StorageError::Unavailable {
                    reason: format!("quota of {quota} bytes exceeded by batch of {} writes", ops.len()),
                });
            }
        }
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("reactions/unknown/likes").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_existing() {
        let backend = MemoryBackend::new();
        backend.put("reactions/a/likes", b"1").await.unwrap();
        backend.put("reactions/a/likes", b"2").await.unwrap();
        let val = backend.get("reactions/a/likes").await.unwrap();
        assert_eq!(val, Some(b"2".to_vec()));
    }

    #[tokio::test]
    async fn delete_missing_key_is_noop() {
        let backend = MemoryBackend::new();
        backend.delete("reactions/a/reaction").await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn list_stops_at_prefix_boundary() {
        let backend = MemoryBackend::new();
        backend.put("reactions/a/dislikes", b"0").await.unwrap();
        backend.put("reactions/a/likes", b"1").await.unwrap();
        backend.put("reactions/b/likes", b"3").await.unwrap();
        backend.put("visitors/x", b"").await.unwrap();

        let keys = backend.list("reactions/a/").await.unwrap();
        assert_eq!(keys, vec!["reactions/a/dislikes", "reactions/a/likes"]);
        assert_eq!(backend.list("").await.unwrap().len(), 4);
        assert!(backend.list("nothing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exists_tracks_put_and_delete() {
        let backend = MemoryBackend::new();
        assert!(!backend.exists("k").await.unwrap());
        backend.put("k", b"v").await.unwrap();
        assert!(backend.exists("k").await.unwrap());
        backend.delete("k").await.unwrap();
        assert!(!backend.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        backend.put("key", b"val").await.unwrap();
        assert_eq!(clone.get("key").await.unwrap(), Some(b"val".to_vec()));
        assert_eq!(clone.len().await, 1);
    }

    #[tokio::test]
    async fn quota_rejects_oversized_write() {
        // "abc" + "12345" = 8 bytes fits; a second key does not.
        let backend = MemoryBackend::with_quota(10);
        backend.put("abc", b"12345").await.unwrap();
        let err = backend.put("def", b"1").await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        assert_eq!(backend.get("def").await.unwrap(), None);
    }

    #[tokio::test]
    async fn batch_over_quota_writes_nothing() {
        let backend = MemoryBackend::with_quota(12);
        backend.put("a", b"1").await.unwrap();

        let err = backend
            .write_batch(vec![
                BatchOp::Put { key: "a".into(), value: b"0".to_vec() },
                BatchOp::Put { key: "bbbbb".into(), value: b"123456".to_vec() },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unavailable { .. }));
        assert_eq!(backend.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn batch_applies_puts_and_deletes() {
        let backend = MemoryBackend::with_quota(16);
        backend.put("gone", b"12345").await.unwrap();
        backend
            .write_batch(vec![
                BatchOp::Delete { key: "gone".into() },
                BatchOp::Put { key: "kept".into(), value: b"123456".to_vec() },
            ])
            .await
            .unwrap();
        assert!(!backend.exists("gone").await.unwrap());
        assert_eq!(backend.get("kept").await.unwrap(), Some(b"123456".to_vec()));
    }

    #[tokio::test]
    async fn quota_counts_overwrite_as_replacement() {
        let backend = MemoryBackend::with_quota(8);
        backend.put("abc", b"12345").await.unwrap();
        backend.put("abc", b"54321").await.unwrap();
        assert_eq!(backend.get("abc").await.unwrap(), Some(b"54321".to_vec()));
    }
}
