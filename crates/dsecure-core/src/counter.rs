//! Reaction counter backed by a storage backend.
//!
//! The counter is the only stateful piece of the site. It loads an item's
//! counts and the visitor's reaction from storage, applies like/dislike
//! transitions, and writes the result back as one all-or-nothing batch.
//!
//! Storage is treated as best-effort, like a browser's local storage: when a
//! read or write fails the counter keeps going on an in-memory copy, logs a
//! warning, and flags the returned record as `degraded`. Only those unsaved
//! records are held in memory; anything storage accepted is read back from
//! storage. Transitions on one counter (and every counter derived from it
//! with [`ReactionCounter::scoped`]) are serialized by a single async mutex,
//! so read-modify-write cycles never interleave inside one process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use dsecure_storage::{BatchOp, ScopedBackend, StorageBackend, StorageError};

use crate::error::ReactionError;
use crate::reaction::{
    validate_item_id, Action, Reaction, ReactionKeys, ReactionRecord, Write,
};

/// Upper bound on unsaved records held in memory across all scopes.
pub const MAX_UNSAVED_RECORDS: usize = 1024;

/// Like/dislike counter for any number of items.
pub struct ReactionCounter {
    storage: Arc<dyn StorageBackend>,
    /// Prefix distinguishing this counter's entries in the shared map.
    scope: String,
    /// Records storage could not save, per `{scope}{item_id}`. Doubles as the
    /// transition lock.
    unsaved: Arc<Mutex<HashMap<String, ReactionRecord>>>,
}

impl std::fmt::Debug for ReactionCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionCounter")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ReactionCounter {
    /// Create a counter over the given storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            scope: String::new(),
            unsaved: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Derive a counter whose keys live under `scope` in the same backend.
    ///
    /// The derived counter shares this counter's lock and unsaved records,
    /// so transitions across scopes stay serialized and degraded state
    /// survives between derived instances.
    #[must_use]
    pub fn scoped(&self, scope: &str) -> Self {
        let backend = ScopedBackend::new(Arc::clone(&self.storage), scope);
        let scope = format!("{}{}", self.scope, backend.prefix());
        Self {
            storage: Arc::new(backend),
            scope,
            unsaved: Arc::clone(&self.unsaved),
        }
    }

    /// Load the record for `item_id` from storage.
    ///
    /// Missing keys read as zero counts and no reaction. If storage cannot be
    /// read, the last unsaved record (or an empty one) is returned with
    /// `degraded` set.
    ///
    /// # Errors
    ///
    /// Returns [`ReactionError::InvalidItemId`] if `item_id` is malformed.
    pub async fn initialize(&self, item_id: &str) -> Result<ReactionRecord, ReactionError> {
        validate_item_id(item_id)?;
        let mut unsaved = self.unsaved.lock().await;
        let record = self.load(item_id, &mut unsaved).await;
        if record.degraded {
            self.remember(&mut unsaved, &record);
        }
        Ok(record)
    }

    /// The current record for `item_id`.
    ///
    /// Returns the in-memory record when the item's latest state could not
    /// be saved, and otherwise reads storage like [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// Returns [`ReactionError::InvalidItemId`] if `item_id` is malformed.
    pub async fn record(&self, item_id: &str) -> Result<ReactionRecord, ReactionError> {
        validate_item_id(item_id)?;
        {
            let unsaved = self.unsaved.lock().await;
            if let Some(pending) = unsaved.get(&self.cache_key(item_id)) {
                return Ok(pending.clone());
            }
        }
        self.initialize(item_id).await
    }

    /// Like `item_id`, or retract an existing like.
    ///
    /// # Errors
    ///
    /// Returns [`ReactionError::InvalidItemId`] if `item_id` is malformed.
    pub async fn like(&self, item_id: &str) -> Result<ReactionRecord, ReactionError> {
        self.transition(item_id, Action::Like).await
    }

    /// Dislike `item_id`, or retract an existing dislike.
    ///
    /// # Errors
    ///
    /// Returns [`ReactionError::InvalidItemId`] if `item_id` is malformed.
    pub async fn dislike(&self, item_id: &str) -> Result<ReactionRecord, ReactionError> {
        self.transition(item_id, Action::Dislike).await
    }

    async fn transition(
        &self,
        item_id: &str,
        action: Action,
    ) -> Result<ReactionRecord, ReactionError> {
        validate_item_id(item_id)?;
        let mut unsaved = self.unsaved.lock().await;

        // Re-read under the lock so another counter instance's writes count.
        let current = self.load(item_id, &mut unsaved).await;
        let transition = current.apply(action);
        let mut next = transition.record;

        // Writes are deltas against what was read; skip them when the read
        // itself came from memory.
        if current.degraded {
            warn!(item_id, action = %action, "storage unreadable, keeping reaction in memory");
            next.degraded = true;
        } else {
            let keys = ReactionKeys::for_item(item_id);
            if let Err(e) = self.persist(&keys, transition.writes).await {
                warn!(
                    item_id,
                    action = %action,
                    error = %e,
                    "reaction write failed, keeping in-memory state"
                );
                next.degraded = true;
            }
        }

        debug!(
            item_id,
            action = %action,
            likes = next.like_count,
            dislikes = next.dislike_count,
            reaction = ?next.reaction,
            degraded = next.degraded,
            "reaction updated"
        );

        if next.degraded {
            self.remember(&mut unsaved, &next);
        } else {
            unsaved.remove(&self.cache_key(item_id));
        }
        Ok(next)
    }

    /// Read the three fields for `item_id`.
    ///
    /// A successful read supersedes any unsaved record; a failed one falls
    /// back to it.
    async fn load(
        &self,
        item_id: &str,
        unsaved: &mut HashMap<String, ReactionRecord>,
    ) -> ReactionRecord {
        let keys = ReactionKeys::for_item(item_id);
        match self.read_fields(item_id, &keys).await {
            Ok(record) => {
                unsaved.remove(&self.cache_key(item_id));
                record
            }
            Err(e) => {
                warn!(item_id, error = %e, "reaction read failed, using in-memory state");
                let mut fallback = unsaved
                    .get(&self.cache_key(item_id))
                    .cloned()
                    .unwrap_or_else(|| ReactionRecord::empty(item_id));
                fallback.degraded = true;
                fallback
            }
        }
    }

    async fn read_fields(
        &self,
        item_id: &str,
        keys: &ReactionKeys,
    ) -> Result<ReactionRecord, StorageError> {
        let likes = self.storage.get(&keys.likes).await?;
        let dislikes = self.storage.get(&keys.dislikes).await?;
        let reaction = self.storage.get(&keys.reaction).await?;

        Ok(ReactionRecord {
            item_id: item_id.to_owned(),
            like_count: parse_count(&keys.likes, likes.as_deref()),
            dislike_count: parse_count(&keys.dislikes, dislikes.as_deref()),
            reaction: parse_reaction(&keys.reaction, reaction.as_deref()),
            degraded: false,
        })
    }

    /// Persist one transition's writes as a single batch.
    async fn persist(&self, keys: &ReactionKeys, writes: Vec<Write>) -> Result<(), StorageError> {
        let ops = writes
            .into_iter()
            .map(|write| match write {
                Write::Likes(n) => BatchOp::Put {
                    key: keys.likes.clone(),
                    value: n.to_string().into_bytes(),
                },
                Write::Dislikes(n) => BatchOp::Put {
                    key: keys.dislikes.clone(),
                    value: n.to_string().into_bytes(),
                },
                Write::SetReaction(r) => match r.as_stored() {
                    Some(raw) => BatchOp::Put {
                        key: keys.reaction.clone(),
                        value: raw.as_bytes().to_vec(),
                    },
                    None => BatchOp::Delete {
                        key: keys.reaction.clone(),
                    },
                },
                Write::ClearReaction => BatchOp::Delete {
                    key: keys.reaction.clone(),
                },
            })
            .collect();
        self.storage.write_batch(ops).await
    }

    /// Hold an unsaved record, unless the map is already full of others.
    fn remember(&self, unsaved: &mut HashMap<String, ReactionRecord>, record: &ReactionRecord) {
        let key = self.cache_key(&record.item_id);
        if unsaved.len() >= MAX_UNSAVED_RECORDS && !unsaved.contains_key(&key) {
            warn!(
                item_id = %record.item_id,
                limit = MAX_UNSAVED_RECORDS,
                "too many unsaved reactions, dropping in-memory state"
            );
            return;
        }
        unsaved.insert(key, record.clone());
    }

    fn cache_key(&self, item_id: &str) -> String {
        format!("{}{item_id}", self.scope)
    }
}

fn parse_count(key: &str, raw: Option<&[u8]>) -> i64 {
    let Some(raw) = raw else { return 0 };
    match std::str::from_utf8(raw).ok().and_then(|s| s.trim().parse().ok()) {
        Some(n) => n,
        None => {
            warn!(key, "unparseable reaction count, treating as 0");
            0
        }
    }
}

fn parse_reaction(key: &str, raw: Option<&[u8]>) -> Reaction {
    let Some(raw) = raw else {
        return Reaction::None;
    };
    Reaction::from_stored(raw).unwrap_or_else(|| {
        warn!(key, "unknown stored reaction, treating as none");
        Reaction::None
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use dsecure_storage::MemoryBackend;

    use super::*;

    fn counter() -> (ReactionCounter, MemoryBackend) {
        let backend = MemoryBackend::new();
        (ReactionCounter::new(Arc::new(backend.clone())), backend)
    }

    /// Wraps a memory backend and fails every call while `down` is set.
    struct FlakyBackend {
        inner: MemoryBackend,
        down: AtomicBool,
    }

    impl FlakyBackend {
        fn check(&self, key: &str) -> Result<(), StorageError> {
            if self.down.load(Ordering::SeqCst) {
                Err(StorageError::Unavailable {
                    reason: format!("storage disabled ({key})"),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait::async_trait]
    impl StorageBackend for FlakyBackend {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.check(key)?;
            self.inner.get(key).await
        }
        async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            self.check(key)?;
            self.inner.put(key, value).await
        }
        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.check(key)?;
            self.inner.delete(key).await
        }
        async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            self.check(prefix)?;
            self.inner.list(prefix).await
        }
    }

    #[tokio::test]
    async fn unseen_item_initializes_empty() {
        let (counter, backend) = counter();
        let record = counter.initialize("never-seen").await.unwrap();
        assert_eq!(record, ReactionRecord::empty("never-seen"));
        // Reading must not create keys.
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn like_then_like_again_toggles_off() {
        let (counter, backend) = counter();
        let liked = counter.like("a").await.unwrap();
        assert_eq!((liked.like_count, liked.reaction), (1, Reaction::Liked));
        assert_eq!(
            backend.get("reactions/a/reaction").await.unwrap(),
            Some(b"liked".to_vec())
        );

        let cleared = counter.like("a").await.unwrap();
        assert_eq!((cleared.like_count, cleared.reaction), (0, Reaction::None));
        assert!(!backend.exists("reactions/a/reaction").await.unwrap());
        assert_eq!(
            backend.get("reactions/a/likes").await.unwrap(),
            Some(b"0".to_vec())
        );
    }

    #[tokio::test]
    async fn dislike_after_like_moves_the_unit() {
        let (counter, _) = counter();
        counter.like("a").await.unwrap();
        let record = counter.dislike("a").await.unwrap();
        assert_eq!(record.like_count, 0);
        assert_eq!(record.dislike_count, 1);
        assert_eq!(record.reaction, Reaction::Disliked);
    }

    #[tokio::test]
    async fn state_survives_reload() {
        let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
        let first = ReactionCounter::new(Arc::clone(&backend));
        let liked = first.like("a").await.unwrap();

        let reloaded = ReactionCounter::new(backend).initialize("a").await.unwrap();
        assert_eq!(reloaded, liked);
    }

    #[tokio::test]
    async fn items_are_independent() {
        let (counter, _) = counter();
        counter.like("a").await.unwrap();
        assert_eq!(
            counter.initialize("b").await.unwrap(),
            ReactionRecord::empty("b")
        );
    }

    #[tokio::test]
    async fn record_reads_storage_when_nothing_is_unsaved() {
        let (counter, backend) = counter();
        counter.like("a").await.unwrap();
        backend.put("reactions/a/likes", b"42").await.unwrap();
        assert_eq!(counter.record("a").await.unwrap().like_count, 42);
    }

    #[tokio::test]
    async fn record_returns_unsaved_state() {
        let counter = ReactionCounter::new(Arc::new(MemoryBackend::with_quota(0)));
        counter.like("a").await.unwrap();

        let record = counter.record("a").await.unwrap();
        assert!(record.degraded);
        assert_eq!((record.like_count, record.reaction), (1, Reaction::Liked));
    }

    #[tokio::test]
    async fn invalid_item_id_is_rejected_before_storage() {
        let (counter, backend) = counter();
        let err = counter.like("../../etc").await.unwrap_err();
        assert!(matches!(err, ReactionError::InvalidItemId { .. }));
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn malformed_stored_values_read_as_defaults() {
        let (counter, backend) = counter();
        backend.put("reactions/a/likes", b"lots").await.unwrap();
        backend.put("reactions/a/reaction", b"meh").await.unwrap();
        backend.put("reactions/a/dislikes", b" 2 ").await.unwrap();

        let record = counter.initialize("a").await.unwrap();
        assert_eq!(record.like_count, 0);
        assert_eq!(record.dislike_count, 2);
        assert_eq!(record.reaction, Reaction::None);
        assert!(!record.degraded);
    }

    #[tokio::test]
    async fn storage_outage_degrades_to_memory() {
        let flaky = Arc::new(FlakyBackend {
            inner: MemoryBackend::new(),
            down: AtomicBool::new(false),
        });
        let counter = ReactionCounter::new(Arc::clone(&flaky) as Arc<dyn StorageBackend>);

        counter.like("a").await.unwrap();
        flaky.down.store(true, Ordering::SeqCst);

        // Clicks keep working from the in-memory copy.
        let switched = counter.dislike("a").await.unwrap();
        assert!(switched.degraded);
        assert_eq!((switched.like_count, switched.dislike_count), (0, 1));

        let read = counter.initialize("a").await.unwrap();
        assert!(read.degraded);
        assert_eq!(read.reaction, Reaction::Disliked);

        // Once storage is back the next transition starts from what was
        // persisted before the outage.
        flaky.down.store(false, Ordering::SeqCst);
        let recovered = counter.like("a").await.unwrap();
        assert!(!recovered.degraded);
        assert_eq!((recovered.like_count, recovered.reaction), (0, Reaction::None));
    }

    #[tokio::test]
    async fn quota_exhaustion_degrades_instead_of_failing() {
        let counter = ReactionCounter::new(Arc::new(MemoryBackend::with_quota(0)));
        let record = counter.like("a").await.unwrap();
        assert!(record.degraded);
        assert_eq!(record.like_count, 1);
        assert_eq!(record.like_label(), "1");
    }

    #[tokio::test]
    async fn failed_switch_leaves_storage_untouched() {
        // Room for exactly one liked item: likes=1 plus reaction=liked.
        let backend = MemoryBackend::with_quota(43);
        let counter = ReactionCounter::new(Arc::new(backend.clone()));
        counter.like("a").await.unwrap();

        let switched = counter.dislike("a").await.unwrap();
        assert!(switched.degraded);
        assert_eq!(switched.reaction, Reaction::Disliked);

        // Nothing from the rejected switch reached storage.
        let reloaded = ReactionCounter::new(Arc::new(backend.clone()))
            .initialize("a")
            .await
            .unwrap();
        assert_eq!(
            (reloaded.like_count, reloaded.dislike_count, reloaded.reaction),
            (1, 0, Reaction::Liked)
        );
        assert!(!reloaded.degraded);

        let retracted = ReactionCounter::new(Arc::new(backend))
            .like("a")
            .await
            .unwrap();
        assert!(retracted.like_count >= 0, "like_count went negative: {retracted:?}");
        assert_eq!((retracted.like_count, retracted.reaction), (0, Reaction::None));
    }

    #[tokio::test]
    async fn read_only_traffic_keeps_nothing_in_memory() {
        let root = ReactionCounter::new(Arc::new(MemoryBackend::new()));
        for i in 0..5000 {
            root.scoped(&format!("visitors/v{i}"))
                .initialize("post")
                .await
                .unwrap();
        }
        root.scoped("visitors/v0").like("post").await.unwrap();
        assert!(root.unsaved.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unsaved_records_are_capped() {
        let root = ReactionCounter::new(Arc::new(MemoryBackend::with_quota(0)));
        for i in 0..MAX_UNSAVED_RECORDS + 50 {
            let record = root
                .scoped(&format!("visitors/v{i}"))
                .like("post")
                .await
                .unwrap();
            assert!(record.degraded);
        }
        assert_eq!(root.unsaved.lock().await.len(), MAX_UNSAVED_RECORDS);
    }

    #[tokio::test]
    async fn scoped_counters_are_isolated() {
        let backend = MemoryBackend::new();
        let root = ReactionCounter::new(Arc::new(backend.clone()));
        let alice = root.scoped("visitors/alice");
        let bob = root.scoped("visitors/bob");

        alice.like("a").await.unwrap();
        assert_eq!(bob.initialize("a").await.unwrap().like_count, 0);
        assert_eq!(root.initialize("a").await.unwrap().like_count, 0);
        assert!(backend
            .exists("visitors/alice/reactions/a/likes")
            .await
            .unwrap());

        // A second handle on the same scope sees alice's state.
        let again = root.scoped("visitors/alice");
        assert_eq!(again.record("a").await.unwrap().reaction, Reaction::Liked);
    }

    #[tokio::test]
    async fn concurrent_clicks_serialize() {
        let counter = Arc::new(ReactionCounter::new(Arc::new(MemoryBackend::new())));
        let mut handles = Vec::new();
        for _ in 0..10 {
            let c = Arc::clone(&counter);
            handles.push(tokio::spawn(async move { c.like("a").await.unwrap() }));
        }
        for h in handles {
            h.await.unwrap();
        }
        // Ten toggles from clean land back on "not liked".
        let record = counter.initialize("a").await.unwrap();
        assert_eq!((record.like_count, record.reaction), (0, Reaction::None));
    }
}
