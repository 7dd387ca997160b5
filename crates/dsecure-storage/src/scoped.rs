//! Prefix-scoped view over another backend.
//!
//! The server keeps every visitor's reactions in one store; a
//! [`ScopedBackend`] confines a visitor to `visitors/{id}/` so the reaction
//! counter above it behaves exactly as it would against a private browser
//! store.

use std::sync::Arc;

use crate::{BatchOp, StorageBackend, StorageError};

/// A backend that prepends a fixed prefix to every key.
///
/// Keys returned from [`list`](StorageBackend::list) have the prefix
/// stripped, so callers never see it.
#[derive(Clone)]
pub struct ScopedBackend {
    inner: Arc<dyn StorageBackend>,
    prefix: String,
}

impl std::fmt::Debug for ScopedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedBackend")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl ScopedBackend {
    /// Wrap `inner`, scoping all keys under `prefix`.
    ///
    /// A trailing `/` is appended to a non-empty prefix that lacks one.
    #[must_use]
    pub fn new(inner: Arc<dyn StorageBackend>, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self { inner, prefix }
    }

    /// The prefix applied to every key.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait::async_trait]
impl StorageBackend for ScopedBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(&self.scoped(key)).await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.inner.put(&self.scoped(key), value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(&self.scoped(key)).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let keys = self.inner.list(&self.scoped(prefix)).await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(self.prefix.as_str()).map(str::to_owned))
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.exists(&self.scoped(key)).await
    }

    async fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        let ops = ops
            .into_iter()
            .map(|op| match op {
                BatchOp::Put { key, value } => BatchOp::Put {
                    key: self.scoped(&key),
                    value,
                },
                BatchOp::Delete { key } => BatchOp::Delete {
                    key: self.scoped(&key),
                },
            })
            .collect();
        self.inner.write_batch(ops).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::MemoryBackend;

    #[tokio::test]
    async fn scopes_keys_under_prefix() {
        let shared = MemoryBackend::new();
        let scoped = ScopedBackend::new(Arc::new(shared.clone()), "visitors/v1");
        assert_eq!(scoped.prefix(), "visitors/v1/");

        scoped.put("reactions/a/likes", b"1").await.unwrap();
        assert_eq!(
            shared.get("visitors/v1/reactions/a/likes").await.unwrap(),
            Some(b"1".to_vec())
        );
        assert!(scoped.exists("reactions/a/likes").await.unwrap());
    }

    #[tokio::test]
    async fn two_scopes_do_not_see_each_other() {
        let shared: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let a = ScopedBackend::new(Arc::clone(&shared), "visitors/a/");
        let b = ScopedBackend::new(Arc::clone(&shared), "visitors/b/");

        a.put("reactions/x/likes", b"1").await.unwrap();
        assert_eq!(b.get("reactions/x/likes").await.unwrap(), None);
        assert!(b.list("").await.unwrap().is_empty());

        b.delete("reactions/x/likes").await.unwrap();
        assert!(a.exists("reactions/x/likes").await.unwrap());
    }

    #[tokio::test]
    async fn batch_is_scoped_and_atomic() {
        let shared = MemoryBackend::with_quota(40);
        let scoped = ScopedBackend::new(Arc::new(shared.clone()), "visitors/a");

        scoped
            .write_batch(vec![BatchOp::Put {
                key: "x".into(),
                value: b"1".to_vec(),
            }])
            .await
            .unwrap();
        assert_eq!(shared.get("visitors/a/x").await.unwrap(), Some(b"1".to_vec()));

        let err = scoped
            .write_batch(vec![
                BatchOp::Delete { key: "x".into() },
                BatchOp::Put {
                    key: "y".into(),
                    value: vec![0; 64],
                },
            ])
            .await;
        assert!(err.is_err());
        assert!(shared.exists("visitors/a/x").await.unwrap());
    }

    #[tokio::test]
    async fn list_strips_prefix() {
        let shared: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let scoped = ScopedBackend::new(Arc::clone(&shared), "visitors/a");
        scoped.put("reactions/x/likes", b"1").await.unwrap();
        scoped.put("reactions/x/reaction", b"liked").await.unwrap();

        let keys = scoped.list("reactions/x/").await.unwrap();
        assert_eq!(keys, vec!["reactions/x/likes", "reactions/x/reaction"]);
    }
}
