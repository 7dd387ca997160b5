//! Visitor identity middleware.
//!
//! Every request is attributed to a visitor, the server-side stand-in for
//! "this browser". The id comes from the `X-Visitor-Id` header, then the
//! `dsecure_visitor` cookie; when neither carries a usable id a fresh UUID
//! is minted and returned in a `Set-Cookie` header.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use dsecure_core::reaction::validate_item_id;

use crate::state::AppState;

/// Header a client may use to name its visitor id explicitly.
pub const VISITOR_HEADER: &str = "x-visitor-id";

/// Cookie holding the visitor id.
pub const VISITOR_COOKIE: &str = "dsecure_visitor";

/// Visitor cookie lifetime: one year.
const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

/// Visitor context injected into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor {
    pub id: String,
}

impl Visitor {
    /// Storage scope holding this visitor's reactions.
    #[must_use]
    pub fn scope(&self) -> String {
        format!("visitors/{}", self.id)
    }
}

/// Middleware that resolves the visitor and inserts a [`Visitor`] extension.
pub async fn visitor_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = visitor_from_headers(req.headers());
    let minted = existing.is_none();
    let id = existing.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if minted {
        tracing::debug!(visitor = %id, "minted visitor id");
    }

    req.extensions_mut().insert(Visitor { id: id.clone() });
    let mut response = next.run(req).await;

    if minted {
        let secure = if state.cookie_secure { "; Secure" } else { "" };
        let cookie = format!(
            "{VISITOR_COOKIE}={id}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; HttpOnly; SameSite=Lax{secure}"
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

/// Extract a valid visitor id from the header or cookie.
///
/// Ids follow the same character rules as item ids since they become a
/// storage key segment. Invalid ids are ignored.
fn visitor_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(VISITOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .map(str::to_owned);

    let from_cookie = || {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == VISITOR_COOKIE)
            .map(|(_, value)| value.to_owned())
    };

    from_header
        .filter(|id| validate_item_id(id).is_ok())
        .or_else(|| from_cookie().filter(|id| validate_item_id(id).is_ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn header_wins_over_cookie() {
        let h = headers(&[
            ("x-visitor-id", "from-header"),
            ("cookie", "dsecure_visitor=from-cookie"),
        ]);
        assert_eq!(visitor_from_headers(&h).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_found_among_others() {
        let h = headers(&[("cookie", "theme=dark; dsecure_visitor=abc-123; lang=en")]);
        assert_eq!(visitor_from_headers(&h).as_deref(), Some("abc-123"));
    }

    #[test]
    fn invalid_header_falls_back_to_cookie() {
        let h = headers(&[
            ("x-visitor-id", "../escape"),
            ("cookie", "dsecure_visitor=ok_id"),
        ]);
        assert_eq!(visitor_from_headers(&h).as_deref(), Some("ok_id"));
    }

    #[test]
    fn nothing_usable_yields_none() {
        assert_eq!(visitor_from_headers(&HeaderMap::new()), None);
        let h = headers(&[("cookie", "dsecure_visitor=")]);
        assert_eq!(visitor_from_headers(&h), None);
    }

    #[test]
    fn scope_prefixes_visitor_id() {
        let v = Visitor { id: "abc".to_owned() };
        assert_eq!(v.scope(), "visitors/abc");
    }
}
