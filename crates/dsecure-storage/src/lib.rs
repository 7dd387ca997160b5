//! Storage backend abstraction for the D-Secure site.
//!
//! This crate defines the [`StorageBackend`] trait, a pure key-value storage
//! interface that stands in for the browser's local storage. It knows nothing
//! about reactions or articles; `dsecure-core` decides what the keys mean.
//!
//! Implementations:
//!
//! - [`RedbBackend`]: persistent, pure-Rust, backed by redb (feature `redb-backend`)
//! - [`MemoryBackend`]: in-memory, for tests and throwaway sessions
//! - [`ScopedBackend`]: wraps another backend and confines it to a key prefix
//!
//! Multi-key updates go through [`StorageBackend::write_batch`], which is
//! all-or-nothing.

mod error;
mod memory;
#[cfg(feature = "redb-backend")]
mod redb_backend;
mod scoped;

pub use error::StorageError;
pub use memory::MemoryBackend;
#[cfg(feature = "redb-backend")]
pub use redb_backend::RedbBackend;
pub use scoped::ScopedBackend;

/// One mutation inside a [`StorageBackend::write_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Store `value` under `key`.
    Put { key: String, value: Vec<u8> },
    /// Remove `key`.
    Delete { key: String },
}

impl BatchOp {
    /// The key this operation touches.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// A pluggable key-value storage backend.
///
/// Keys are UTF-8 strings using `/` as a separator (e.g.
/// `reactions/secure-erase-ssd/likes`). Values are opaque byte arrays.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Retrieve a value by key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store a key-value pair, overwriting any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Write`] if the underlying backend fails.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Deleting a non-existent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the underlying backend fails.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// List all keys that start with the given prefix, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] if the underlying backend fails.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Check whether a key exists in storage.
    ///
    /// The default implementation calls [`get`](StorageBackend::get) and checks
    /// for `Some`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the underlying backend fails.
    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key).await?.is_some())
    }

    /// Apply every operation in `ops`, or none of them.
    ///
    /// The default implementation applies the operations one at a time and,
    /// on the first failure, restores every key it already touched to its
    /// previous value. Backends with native transactions should override it.
    ///
    /// # Errors
    ///
    /// Returns the error of the first operation that failed. Storage is left
    /// as it was before the call unless the rollback itself fails, which is
    /// logged.
    async fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        let mut undo: Vec<(String, Option<Vec<u8>>)> = Vec::with_capacity(ops.len());
        for op in ops {
            let previous = self.get(op.key()).await?;
            let applied = match &op {
                BatchOp::Put { key, value } => self.put(key, value).await,
                BatchOp::Delete { key } => self.delete(key).await,
            };
            if let Err(e) = applied {
                for (key, previous) in undo.into_iter().rev() {
                    let restored = match previous {
                        Some(value) => self.put(&key, &value).await,
                        None => self.delete(&key).await,
                    };
                    if let Err(re) = restored {
                        tracing::warn!(key = %key, error = %re, "batch rollback failed");
                    }
                }
                return Err(e);
            }
            undo.push((op.key().to_owned(), previous));
        }
        Ok(())
    }
}
