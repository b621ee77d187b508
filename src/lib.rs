//! gatekv -- S3-compatible action dispatch core over an indexed KV +
//! object backing store.
//!
//! This crate provides the Action State Machine (`crate::action`): the
//! per-request pipeline that sequences validation, metadata I/O, object
//! I/O, and response emission for the two verbs it implements in full,
//! against a Motr/Clovis-style backend reached only through the trait
//! objects in `crate::ports`.

use std::sync::Arc;

pub mod action;
pub mod backend;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod ports;
pub mod server;
pub mod xml;

use crate::action::Backends;
use crate::config::Config;

/// Shared application state passed to every handler via `axum::extract::State`.
pub struct AppState {
    /// Process-wide read-only configuration, loaded once at startup.
    pub config: Arc<Config>,
    /// The backend port implementations actions are run against.
    pub backends: Backends,
}
