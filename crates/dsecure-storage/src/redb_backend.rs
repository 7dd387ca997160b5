//! Persistent redb storage backend.
//!
//! A single redb file plays the part of one browser profile's local storage.
//! redb is pure Rust and transactional; every `put` and `delete` commits its
//! own write transaction, and a batch commits all of its operations in one. Blocking redb calls run on the Tokio blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, TableDefinition};

use crate::{BatchOp, StorageBackend, StorageError};

/// The single table holding every key-value pair.
/// Key namespacing is handled by callers (`reactions/...`, `visitors/...`).
const DATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("data");

/// A storage backend backed by a redb database file.
///
/// # Examples
///
/// ```no_run
/// # use dsecure_storage::RedbBackend;
/// let backend = RedbBackend::open("./data/reactions.redb").unwrap();
/// ```
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn transaction_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Transaction {
        reason: e.to_string(),
    }
}

fn table_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::MissingTable {
        name: format!("data: {e}"),
    }
}

impl RedbBackend {
    /// Open or create a redb database at the given path.
    ///
    /// Parent directories are created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the file cannot be created or opened,
    /// or [`StorageError::Transaction`] if the data table cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let open_err = |reason: String| StorageError::Open {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| open_err(e.to_string()))?;
        }

        let db = Database::create(path).map_err(|e| open_err(e.to_string()))?;

        // Opening the table inside a write transaction creates it.
        let txn = db.begin_write().map_err(transaction_err)?;
        {
            let _table = txn.open_table(DATA_TABLE).map_err(table_err)?;
        }
        txn.commit().map_err(transaction_err)?;

        tracing::debug!(path = %path.display(), "opened redb storage");

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Return the filesystem path of this database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a blocking redb closure on the blocking pool, mapping a join
    /// failure through `on_panic`.
    async fn blocking<T, F>(
        &self,
        f: F,
        on_panic: impl FnOnce(String) -> StorageError,
    ) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StorageError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| on_panic(format!("blocking task panicked: {e}")))?
    }
}

#[async_trait::async_trait]
impl StorageBackend for RedbBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let owned = key.to_owned();
        let k = key.to_owned();
        self.blocking(
            move |db| {
                let txn = db.begin_read().map_err(transaction_err)?;
                let table = txn.open_table(DATA_TABLE).map_err(table_err)?;
                let value = table
                    .get(owned.as_str())
                    .map_err(|e| StorageError::Read {
                        key: owned.clone(),
                        reason: e.to_string(),
                    })?
                    .map(|v| v.value().to_vec());
                Ok(value)
            },
            |reason| StorageError::Read { key: k, reason },
        )
        .await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let owned = key.to_owned();
        let k = key.to_owned();
        let value = value.to_vec();
        self.blocking(
            move |db| {
                let txn = db.begin_write().map_err(transaction_err)?;
                {
                    let mut table = txn.open_table(DATA_TABLE).map_err(table_err)?;
                    table
                        .insert(owned.as_str(), value.as_slice())
                        .map_err(|e| StorageError::Write {
                            key: owned.clone(),
                            reason: e.to_string(),
                        })?;
                }
                txn.commit().map_err(transaction_err)
            },
            |reason| StorageError::Write { key: k, reason },
        )
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let owned = key.to_owned();
        let k = key.to_owned();
        self.blocking(
            move |db| {
                let txn = db.begin_write().map_err(transaction_err)?;
                {
                    let mut table = txn.open_table(DATA_TABLE).map_err(table_err)?;
                    table
                        .remove(owned.as_str())
                        .map_err(|e| StorageError::Delete {
                            key: owned.clone(),
                            reason: e.to_string(),
                        })?;
                }
                txn.commit().map_err(transaction_err)
            },
            |reason| StorageError::Delete { key: k, reason },
        )
        .await
    }

    async fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), StorageError> {
        self.blocking(
            move |db| {
                let txn = db.begin_write().map_err(transaction_err)?;
                {
                    let mut table = txn.open_table(DATA_TABLE).map_err(table_err)?;
                    for op in &ops {
                        match op {
                            BatchOp::Put { key, value } => {
                                table.insert(key.as_str(), value.as_slice()).map_err(|e| {
                                    StorageError::Write {
                                        key: key.clone(),
                                        reason: e.to_string(),
                                    }
                                })?;
                            }
                            BatchOp::Delete { key } => {
                                table.remove(key.as_str()).map_err(|e| StorageError::Delete {
                                    key: key.clone(),
                                    reason: e.to_string(),
                                })?;
                            }
                        }
                    }
                }
                // Dropping an uncommitted transaction aborts it.
                txn.commit().map_err(transaction_err)
            },
            |reason| StorageError::Transaction { reason },
        )
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let owned = prefix.to_owned();
        let p = prefix.to_owned();
        self.blocking(
            move |db| {
                let list_err = |e: &dyn std::fmt::Display| StorageError::List {
                    prefix: owned.clone(),
                    reason: e.to_string(),
                };
                let txn = db.begin_read().map_err(transaction_err)?;
                let table = txn.open_table(DATA_TABLE).map_err(table_err)?;

                let mut keys = Vec::new();
                let range = table.range(owned.as_str()..).map_err(|e| list_err(&e))?;
                for item in range {
                    let (k, _) = item.map_err(|e| list_err(&e))?;
                    let key = k.value();
                    if !key.starts_with(owned.as_str()) {
                        break;
                    }
                    keys.push(key.to_owned());
                }
                Ok(keys)
            },
            |reason| StorageError::List { prefix: p, reason },
        )
        .await
    }
}
