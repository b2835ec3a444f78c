//! Error types for `secours-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::intervention::InterventionStatus;

/// The kind of record an [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  User,
  RescueService,
  RescueMember,
  Alert,
  Intervention,
  Notification,
}

/// Why a write was refused given the current state of other records.
///
/// Operators act differently on each reason (pick another rescuer, or treat
/// the alert as handled), so callers always receive the specific variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConflictReason {
  /// The alert already has an intervention in a non-terminal state.
  AlertAlreadyDispatched,
  /// The rescuer is already assigned to a non-terminal intervention.
  RescuerBusy,
  /// The alert is RESOLVED or CANCELLED.
  AlertClosed,
  /// The alert cannot be cancelled while an intervention is under way.
  AlertHasActiveIntervention,
  DuplicateBadge,
  /// The user account is already bound to a rescuer profile.
  RescuerAlreadyRegistered,
}

/// Why a rescue member is not a valid dispatch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IneligibleReason {
  OffDuty,
  AccountInactive,
  ServiceInactive,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: Uuid },

  #[error("conflict: {0}")]
  Conflict(ConflictReason),

  #[error("rescue member {id} is not a valid target: {reason}")]
  InvalidTarget { id: Uuid, reason: IneligibleReason },

  #[error("invalid transition from {current} to {requested}")]
  InvalidTransition {
    current:    InterventionStatus,
    requested:  InterventionStatus,
    valid_next: Vec<InterventionStatus>,
  },

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("validation error: {0}")]
  Validation(String),

  /// A push gateway or other downstream collaborator failed. Never returned
  /// from dispatch or transition; only logged by the fan-out.
  #[error("dependency failure: {0}")]
  DependencyFailure(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }

  pub fn forbidden(msg: impl Into<String>) -> Self { Self::Forbidden(msg.into()) }

  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  /// Wrap an opaque backend failure.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
