//! Reaction routes: `/v1/reactions/*`
//!
//! Each request acts on the calling visitor's own reaction state.
//!
//! - `GET  /v1/reactions/{item_id}`: current counts and reaction
//! - `POST /v1/reactions/{item_id}/like`: like, or retract a like
//! - `POST /v1/reactions/{item_id}/dislike`: dislike, or retract a dislike

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Serialize;

use dsecure_core::reaction::{Reaction, ReactionRecord};

use crate::error::AppError;
use crate::middleware::Visitor;
use crate::state::AppState;

/// Build the `/v1/reactions` router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{item_id}", get(read_reaction))
        .route("/{item_id}/like", post(like))
        .route("/{item_id}/dislike", post(dislike))
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub item_id: String,
    pub like_count: i64,
    pub dislike_count: i64,
    pub reaction: Reaction,
    /// Button text after applying the display rule.
    pub like_label: String,
    pub dislike_label: String,
    pub degraded: bool,
}

impl From<ReactionRecord> for ReactionResponse {
    fn from(r: ReactionRecord) -> Self {
        Self {
            like_label: r.like_label(),
            dislike_label: r.dislike_label(),
            item_id: r.item_id,
            like_count: r.like_count,
            dislike_count: r.dislike_count,
            reaction: r.reaction,
            degraded: r.degraded,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn read_reaction(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
    Path(item_id): Path<String>,
) -> Result<Json<ReactionResponse>, AppError> {
    let counter = state.reactions.scoped(&visitor.scope());
    let record = counter.initialize(&item_id).await?;
    Ok(Json(record.into()))
}

async fn like(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
    Path(item_id): Path<String>,
) -> Result<Json<ReactionResponse>, AppError> {
    let counter = state.reactions.scoped(&visitor.scope());
    let record = counter.like(&item_id).await?;
    Ok(Json(record.into()))
}

async fn dislike(
    State(state): State<Arc<AppState>>,
    Extension(visitor): Extension<Visitor>,
    Path(item_id): Path<String>,
) -> Result<Json<ReactionResponse>, AppError> {
    let counter = state.reactions.scoped(&visitor.scope());
    let record = counter.dislike(&item_id).await?;
    Ok(Json(record.into()))
}
