//! Error types for `dsecure-core`.
//!
//! Storage failures during reactions are absorbed by the counter (it falls
//! back to in-memory state), so the only error a caller sees is bad input.

/// Errors from reaction counter operations.
#[derive(Debug, thiserror::Error)]
pub enum ReactionError {
    /// The item identifier cannot be used as a storage scope.
    #[error("invalid item id '{item_id}': {reason}")]
    InvalidItemId { item_id: String, reason: String },
}
