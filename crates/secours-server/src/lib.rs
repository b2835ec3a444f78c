//! Server-side wiring for Secours: configuration and the HTTP push gateway.
//!
//! The `secours-server` binary in `main.rs` puts these together with an
//! [`secours_store_sqlite::SqliteStore`] and the [`secours_api`] router.

pub mod config;
pub mod push;

pub use self::{
  config::{PushConfig, ServerConfig},
  push::{Gateway, HttpPushGateway},
};
