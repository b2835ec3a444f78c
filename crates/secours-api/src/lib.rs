//! JSON REST API for Secours.
//!
//! Exposes an axum [`Router`] over a running [`secours_core::Engine`]. Every
//! route requires the service credential (HTTP Basic) and names the acting
//! user in the `X-Actor-Id` header; see [`auth`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", secours_api::api_router(state))
//! ```

pub mod alerts;
pub mod auth;
pub mod dispatch;
pub mod eligibility;
pub mod error;
pub mod extract;
pub mod interventions;
pub mod notifications;
pub mod rescue;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use secours_core::{Engine, fanout::PushGateway, store::EntityStore};

pub use auth::{Actor, AuthConfig};
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, G> {
  pub engine: Arc<Engine<S, G>>,
  pub auth:   Arc<AuthConfig>,
}

impl<S, G> Clone for AppState<S, G> {
  fn clone(&self) -> Self {
    Self {
      engine: Arc::clone(&self.engine),
      auth:   Arc::clone(&self.auth),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(state: AppState<S, G>) -> Router<()>
where
  S: EntityStore,
  G: PushGateway,
{
  Router::new()
    // Dispatch and lifecycle
    .route("/dispatch", post(dispatch::create::<S, G>))
    .route("/intervention/{id}/status", patch(interventions::set_status::<S, G>))
    .route("/interventions/{id}", get(interventions::get_one::<S, G>))
    .route("/eligibility/{alert_id}", get(eligibility::candidates::<S, G>))
    // Alerts
    .route("/alerts", post(alerts::submit::<S, G>))
    .route("/alerts/{id}", get(alerts::get_one::<S, G>))
    .route("/alerts/{id}/cancel", post(alerts::cancel::<S, G>))
    .route("/alerts/{id}/interventions", get(alerts::interventions::<S, G>))
    // Notifications
    .route("/notifications", post(notifications::send::<S, G>))
    .route("/notifications/unread", get(notifications::unread::<S, G>))
    .route("/notifications/{id}/read", patch(notifications::mark_read::<S, G>))
    // Directory
    .route("/users", post(users::create::<S, G>))
    .route("/users/{id}/active", patch(users::set_active::<S, G>))
    .route("/users/{id}/push-ids", post(users::register_push_id::<S, G>))
    .route("/rescue-services", post(rescue::create_service::<S, G>))
    .route(
      "/rescue-services/{id}/active",
      patch(rescue::set_service_active::<S, G>),
    )
    .route("/rescue-members", post(rescue::create_member::<S, G>))
    .route("/rescue-members/{id}/duty", patch(rescue::set_duty::<S, G>))
    .with_state(state)
}
