//! Server configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `DSECURE_*` environment variables.

use std::net::SocketAddr;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Add `Secure` to the visitor cookie (enable behind HTTPS).
    pub cookie_secure: bool,
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (reactions are lost on restart).
    Memory,
    /// Redb persistent storage.
    Redb { path: String },
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on, binds to `0.0.0.0`
    /// - `DSECURE_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:8080`)
    /// - `DSECURE_STORAGE`: `memory` or `redb` (default: `memory`)
    /// - `DSECURE_STORAGE_PATH`: redb file path (default: `./data/reactions.redb`)
    /// - `DSECURE_LOG_LEVEL`: log filter (default: `info`)
    /// - `DSECURE_COOKIE_SECURE`: mark the visitor cookie `Secure` (default: `false`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr = SocketAddr::from(([127, 0, 0, 1], 8080));

        // Priority: DSECURE_BIND_ADDR > PORT > default.
        let bind_addr = if let Some(addr) = lookup("DSECURE_BIND_ADDR") {
            addr.parse().unwrap_or(default_addr)
        } else if let Some(port) = lookup("PORT") {
            SocketAddr::from(([0, 0, 0, 0], port.parse().unwrap_or(8080)))
        } else {
            default_addr
        };

        let storage_path =
            lookup("DSECURE_STORAGE_PATH").unwrap_or_else(|| "./data/reactions.redb".to_owned());

        let storage_backend = match lookup("DSECURE_STORAGE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "redb" => StorageBackendType::Redb { path: storage_path },
            _ => StorageBackendType::Memory,
        };

        let log_level = lookup("DSECURE_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let cookie_secure = lookup("DSECURE_COOKIE_SECURE")
            .is_some_and(|v| v == "true" || v == "1");

        Self {
            bind_addr,
            storage_backend,
            log_level,
            cookie_secure,
        }
    }
}
