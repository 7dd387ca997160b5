//! Core library for the D-Secure marketing site.
//!
//! Contains the like/dislike reaction model and its state transitions, the
//! [`ReactionCounter`](counter::ReactionCounter) that persists reactions
//! through a `dsecure-storage` backend, and the static article catalog the
//! site renders. Nothing here knows about HTTP.

pub mod content;
pub mod counter;
pub mod error;
pub mod reaction;
