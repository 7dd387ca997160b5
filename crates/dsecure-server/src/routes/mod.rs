//! HTTP route handlers.
//!
//! Routes are organized by concern:
//! - `pages`: landing page, news listing, and article pages (HTML)
//! - `reactions`: like/dislike JSON API
//! - `sys`: health check

pub mod pages;
pub mod reactions;
pub mod sys;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::middleware as axum_mw;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::visitor_middleware;
use crate::state::AppState;

const REACTION_CONCURRENCY: usize = 64;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Reaction writes serialize on one lock; cap how many queue behind it.
    let api = Router::new()
        .nest("/v1/reactions", reactions::router())
        .layer(tower::limit::ConcurrencyLimitLayer::new(REACTION_CONCURRENCY))
        .nest("/v1/sys", sys::router());

    Router::new()
        .merge(pages::router())
        .merge(api)
        .fallback(api_not_found)
        .layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            visitor_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}

/// JSON 404 under `/v1/`, the HTML 404 page everywhere else.
async fn api_not_found(uri: axum::http::Uri) -> Response {
    if uri.path().starts_with("/v1/") {
        AppError::NotFound(format!("no route for {}", uri.path())).into_response()
    } else {
        pages::not_found_page().into_response()
    }
}
