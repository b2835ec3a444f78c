//! The `EntityStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `secours-store-sqlite`).
//! The store is the single source of truth and the only point of mutual
//! exclusion: [`EntityStore::dispatch`] and [`EntityStore::apply_transition`]
//! must evaluate the core's pure checks and perform their writes inside one
//! transaction, so that the effective order of operations on an alert or a
//! rescue member matches commit order across any number of service
//! instances.

use std::future::Future;

use uuid::Uuid;

use crate::{
  alert::{Alert, NewAlert},
  dispatch::Dispatched,
  intervention::{Intervention, NewIntervention, TransitionRequest},
  lifecycle::Transitioned,
  notification::{MassTarget, NewNotification, Notification},
  rescue::{MemberStanding, NewRescueMember, RescueMember, RescueService},
  user::{NewUser, Role, User},
};

/// Abstraction over a Secours entity store backend.
///
/// Domain rejections raised inside a transaction (`Conflict`, `NotFound`,
/// `InvalidTransition`, ...) must survive the conversion into
/// [`crate::Error`] unchanged; backend failures become [`crate::Error::Store`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait EntityStore: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Fails with `NotFound` for unknown users.
  fn set_user_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Register an external push identifier for a user. Registering the same
  /// pair twice is a no-op.
  fn add_push_identifier(
    &self,
    user_id: Uuid,
    external_id: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn push_identifiers_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Push identifiers of every *active* user with `role`, as of now.
  fn push_identifiers_for_role(
    &self,
    role: Role,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Rescue services and members ───────────────────────────────────────

  fn add_rescue_service(
    &self,
    name: String,
  ) -> impl Future<Output = Result<RescueService, Self::Error>> + Send + '_;

  fn get_rescue_service(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RescueService>, Self::Error>> + Send + '_;

  fn set_rescue_service_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<RescueService, Self::Error>> + Send + '_;

  /// Create a rescuer profile. Fails with `NotFound` for an unknown user or
  /// service, `Validation` if the user is not a rescuer, and `Conflict` on a
  /// duplicate badge number or an already-bound user.
  fn add_rescue_member(
    &self,
    input: NewRescueMember,
  ) -> impl Future<Output = Result<RescueMember, Self::Error>> + Send + '_;

  fn get_rescue_member(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RescueMember>, Self::Error>> + Send + '_;

  fn set_on_duty(
    &self,
    id: Uuid,
    on_duty: bool,
  ) -> impl Future<Output = Result<RescueMember, Self::Error>> + Send + '_;

  /// Every rescue member with its account, service and assignment standing,
  /// ordered by `rescue_member_id`.
  fn member_standings(
    &self,
  ) -> impl Future<Output = Result<Vec<MemberStanding>, Self::Error>> + Send + '_;

  // ── Alerts ────────────────────────────────────────────────────────────

  /// Persist a PENDING alert. Fails with `NotFound` for an unknown reporter.
  fn add_alert(
    &self,
    input: NewAlert,
  ) -> impl Future<Output = Result<Alert, Self::Error>> + Send + '_;

  fn get_alert(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  /// Atomically move an alert to CANCELLED. Fails with `Conflict` when the
  /// alert is closed or has a non-terminal intervention.
  fn cancel_alert(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Alert, Self::Error>> + Send + '_;

  // ── Interventions ─────────────────────────────────────────────────────

  /// In one transaction: load the alert and the rescue member (`NotFound`
  /// if either is missing), evaluate
  /// [`crate::dispatch::check_preconditions`], insert an EN_ROUTE
  /// intervention, and move the alert to ACCEPTED.
  fn dispatch(
    &self,
    input: NewIntervention,
  ) -> impl Future<Output = Result<Dispatched, Self::Error>> + Send + '_;

  fn get_intervention(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Intervention>, Self::Error>> + Send + '_;

  /// All interventions ever created for an alert, oldest first.
  fn interventions_for_alert(
    &self,
    alert_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Intervention>, Self::Error>> + Send + '_;

  /// In one transaction: load the intervention (`NotFound` if missing) and
  /// its assignee, evaluate [`crate::intervention::plan_transition`], write
  /// the intervention, and cascade the alert status if the plan says so.
  fn apply_transition(
    &self,
    request: TransitionRequest,
  ) -> impl Future<Output = Result<Transitioned, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  fn add_notification(
    &self,
    input: NewNotification,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;

  fn get_notification(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + '_;

  /// Unread notifications addressed to `user_id` directly or, when `target`
  /// is given, broadcast to that population. Oldest first.
  fn unread_notifications(
    &self,
    user_id: Uuid,
    target: Option<MassTarget>,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Set `is_read`. Idempotent; fails with `NotFound` for unknown ids.
  fn mark_read(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Notification, Self::Error>> + Send + '_;
}
