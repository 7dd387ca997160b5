//! Reaction data model and state transitions.
//!
//! A visitor holds at most one reaction per item. Liking an item that is
//! already liked retracts the like; liking a disliked item moves the unit
//! from the dislike counter to the like counter in one transition. The
//! transition functions here are pure: they return the next record together
//! with the storage writes needed to persist it, and the
//! [`ReactionCounter`](crate::counter::ReactionCounter) applies those writes.

use serde::{Deserialize, Serialize};

use crate::error::ReactionError;

/// Maximum length of an item identifier in bytes.
pub const MAX_ITEM_ID_LEN: usize = 128;

/// Label shown in place of a zero like count.
pub const LIKE_LABEL: &str = "Like";

/// Label shown in place of a zero dislike count.
pub const DISLIKE_LABEL: &str = "Dislike";

/// The current visitor's reaction to one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    /// No reaction recorded. Stored as an absent key.
    #[default]
    None,
    /// The visitor liked the item.
    Liked,
    /// The visitor disliked the item.
    Disliked,
}

impl Reaction {
    /// The stored representation, or `None` when the key should be absent.
    #[must_use]
    pub fn as_stored(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Liked => Some("liked"),
            Self::Disliked => Some("disliked"),
        }
    }

    /// Parse a stored value. Unknown values yield `None`.
    #[must_use]
    pub fn from_stored(raw: &[u8]) -> Option<Self> {
        match raw {
            b"liked" => Some(Self::Liked),
            b"disliked" => Some(Self::Disliked),
            _ => None,
        }
    }
}

/// A user action on the reaction widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Like,
    Dislike,
}

impl Action {
    /// The reaction this action sets when it is not a retraction.
    fn target(self) -> Reaction {
        match self {
            Self::Like => Reaction::Liked,
            Self::Dislike => Reaction::Disliked,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Like => f.write_str("like"),
            Self::Dislike => f.write_str("dislike"),
        }
    }
}

/// Reaction counts and the visitor's own reaction for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub item_id: String,
    pub like_count: i64,
    pub dislike_count: i64,
    pub reaction: Reaction,
    /// Set when the last operation could not reach storage and the record
    /// reflects in-memory state only.
    #[serde(default)]
    pub degraded: bool,
}

/// A single storage mutation produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    Likes(i64),
    Dislikes(i64),
    SetReaction(Reaction),
    ClearReaction,
}

/// The outcome of applying an [`Action`] to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub record: ReactionRecord,
    pub writes: Vec<Write>,
}

impl ReactionRecord {
    /// A fresh record: zero counts, no reaction.
    #[must_use]
    pub fn empty(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            like_count: 0,
            dislike_count: 0,
            reaction: Reaction::None,
            degraded: false,
        }
    }

    /// Apply `action` and return the next record plus the writes that
    /// persist it.
    ///
    /// Only counters that actually change are written. The reaction key is
    /// always written, or cleared when the reaction reverts to `None`.
    #[must_use]
    pub fn apply(&self, action: Action) -> Transition {
        let mut next = self.clone();
        let target = action.target();

        if self.reaction == target {
            // Retract.
            next.bump(target, -1);
            next.reaction = Reaction::None;
        } else {
            if self.reaction != Reaction::None {
                // Switch: take the unit back from the other counter.
                next.bump(self.reaction, -1);
            }
            next.bump(target, 1);
            next.reaction = target;
        }

        let mut writes = Vec::with_capacity(3);
        if next.like_count != self.like_count {
            writes.push(Write::Likes(next.like_count));
        }
        if next.dislike_count != self.dislike_count {
            writes.push(Write::Dislikes(next.dislike_count));
        }
        writes.push(match next.reaction {
            Reaction::None => Write::ClearReaction,
            r => Write::SetReaction(r),
        });

        Transition {
            record: next,
            writes,
        }
    }

    /// Add `delta` to the counter for `reaction`, saturating at the `i64`
    /// bounds so a tampered stored count cannot overflow.
    fn bump(&mut self, reaction: Reaction, delta: i64) {
        let count = match reaction {
            Reaction::Disliked => &mut self.dislike_count,
            Reaction::Liked | Reaction::None => &mut self.like_count,
        };
        *count = count.saturating_add(delta);
    }

    /// Text for the like button.
    #[must_use]
    pub fn like_label(&self) -> String {
        display_count(self.like_count, LIKE_LABEL)
    }

    /// Text for the dislike button.
    #[must_use]
    pub fn dislike_label(&self) -> String {
        display_count(self.dislike_count, DISLIKE_LABEL)
    }
}

/// Render `count` if it is positive, otherwise `label`.
#[must_use]
pub fn display_count(count: i64, label: &str) -> String {
    if count > 0 {
        count.to_string()
    } else {
        label.to_owned()
    }
}

/// Storage keys for one item's reaction fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionKeys {
    pub likes: String,
    pub dislikes: String,
    pub reaction: String,
}

impl ReactionKeys {
    /// Keys for `item_id`. The id must already be validated.
    #[must_use]
    pub fn for_item(item_id: &str) -> Self {
        Self {
            likes: format!("reactions/{item_id}/likes"),
            dislikes: format!("reactions/{item_id}/dislikes"),
            reaction: format!("reactions/{item_id}/reaction"),
        }
    }
}

/// Validate an item identifier.
///
/// - Must not be empty or longer than [`MAX_ITEM_ID_LEN`] bytes.
/// - Only ASCII alphanumerics, `-`, and `_`.
///
/// # Errors
///
/// Returns [`ReactionError::InvalidItemId`] describing the first rule broken.
pub fn validate_item_id(item_id: &str) -> Result<(), ReactionError> {
    let invalid = |reason: &str| ReactionError::InvalidItemId {
        item_id: item_id.to_owned(),
        reason: reason.to_owned(),
    };

    if item_id.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if item_id.len() > MAX_ITEM_ID_LEN {
        return Err(invalid("exceeds 128 bytes"));
    }
    if !item_id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(invalid(
            "may only contain alphanumeric characters, '-', and '_'",
        ));
    }
    Ok(())
}
