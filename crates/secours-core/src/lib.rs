//! Core types and the dispatch engine for the Secours emergency-response
//! platform.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::EntityStore`]; push providers implement
//! [`fanout::PushGateway`]. The [`engine::Engine`] ties them together and owns
//! every operation that mutates alerts, interventions and notifications.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod alert;
pub mod audit;
pub mod directory;
pub mod dispatch;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod intervention;
pub mod lifecycle;
pub mod notification;
pub mod rescue;
pub mod store;
pub mod user;

pub use engine::{Engine, EngineConfig};
pub use error::{Error, Result};

#[cfg(test)]
mod testing;
