//! Library for reccall: record named prompt shortcuts and call them back.
//!
//! This crate exposes:
//! - `config`: load/save settings from `~/.reccall/settings.toml`.
//! - `error`: repository error types.
//! - `recipe`: recipe and manifest types plus recipe validation.
//! - `store`: the JSON shortcut store with starter-pack bootstrap.
//! - `starter_pack`: the bundled recipe pack loader.
//! - `repo`: remote recipe repositories with a TTL cache.
//! - `service`: record/update/delete/purge/call/list/search and friends.
//! - `server`: rmcp server exposing those verbs as tools.
//! - `http_router`: axum router for the streamable HTTP transport and `/healthz`.

pub mod config;
pub mod error;
pub mod http_router;
pub mod recipe;
pub mod repo;
pub mod server;
pub mod service;
pub mod starter_pack;
pub mod store;

pub use http_router::AppState;
pub use server::RecCallServer;
pub use service::ShortcutService;
pub use store::{ShortcutMap, Store};
