//! D-Secure site server.
//!
//! Wires the reaction counter and article catalog from `dsecure-core` into
//! an Axum application. Serves HTML pages at `/`, `/news`, and
//! `/blog/{slug}`, and the JSON reaction API at `/v1/reactions/*`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
