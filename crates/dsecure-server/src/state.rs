//! Shared application state.
//!
//! A single [`AppState`] is built at startup and shared across handlers via
//! `Arc`.

use std::sync::Arc;

use dsecure_core::counter::ReactionCounter;
use dsecure_storage::StorageBackend;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Root reaction counter. Handlers derive a per-visitor counter from it.
    pub reactions: ReactionCounter,
    /// Whether the visitor cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
}

impl AppState {
    /// Build state over the given storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, cookie_secure: bool) -> Self {
        Self {
            reactions: ReactionCounter::new(storage),
            cookie_secure,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cookie_secure", &self.cookie_secure)
            .finish_non_exhaustive()
    }
}
