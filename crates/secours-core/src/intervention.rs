//! Interventions and their state machine.
//!
//! ```text
//!   EN_ROUTE ──▶ SUR_PLACE ──▶ TERMINEE
//!      │             │
//!      └─────────────┴──────▶ ANNULEE
//! ```
//!
//! Every state has an explicit, possibly empty, set of successors. Anything
//! outside that set is an [`Error::InvalidTransition`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  alert::AlertStatus,
  user::Principal,
};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InterventionStatus {
  EnRoute,
  SurPlace,
  Terminee,
  Annulee,
}

impl InterventionStatus {
  pub const INITIAL: Self = Self::EnRoute;

  /// The non-terminal states. At most one intervention per alert and per
  /// rescue member may be in one of these.
  pub const ACTIVE: [Self; 2] = [Self::EnRoute, Self::SurPlace];

  /// The transition table.
  pub fn allowed_next_states(self) -> &'static [Self] {
    match self {
      Self::EnRoute => &[Self::SurPlace, Self::Annulee],
      Self::SurPlace => &[Self::Terminee, Self::Annulee],
      Self::Terminee => &[],
      Self::Annulee => &[],
    }
  }

  pub fn can_transition_to(self, next: Self) -> bool {
    self.allowed_next_states().contains(&next)
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Terminee | Self::Annulee)
  }
}

// ─── Intervention ────────────────────────────────────────────────────────────

/// One response episode binding an alert to a rescue member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intervention {
  pub intervention_id:  Uuid,
  pub alert_id:         Uuid,
  pub rescue_member_id: Uuid,
  /// The administrator (or automated matcher) that created the binding.
  pub dispatched_by:    Uuid,
  pub status:           InterventionStatus,
  pub start_time:       DateTime<Utc>,
  /// Set once, on entering SUR_PLACE.
  pub arrival_time:     Option<DateTime<Utc>>,
  /// Set once, on entering a terminal state.
  pub end_time:         Option<DateTime<Utc>>,
  pub notes:            Option<String>,
}

/// Input to [`crate::store::EntityStore::dispatch`].
#[derive(Debug, Clone, Copy)]
pub struct NewIntervention {
  pub alert_id:         Uuid,
  pub rescue_member_id: Uuid,
  pub dispatched_by:    Uuid,
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// A status change requested by a rescuer or an administrator.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
  pub intervention_id: Uuid,
  pub requested:       InterventionStatus,
  pub actor:           Principal,
  /// Replaces the intervention notes when present.
  pub notes:           Option<String>,
}

/// The writes a legal transition implies, computed before anything is
/// persisted.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
  pub intervention: Intervention,
  pub previous:     InterventionStatus,
  /// New status for the linked alert, if the transition cascades.
  pub alert_status: Option<AlertStatus>,
}

/// Validate `request` against `current` and compute the resulting writes.
///
/// `assignee_user_id` is the user account linked to the assigned rescue
/// member; only that user or an administrator may move the intervention.
pub fn plan_transition(
  current: &Intervention,
  assignee_user_id: Uuid,
  request: &TransitionRequest,
  now: DateTime<Utc>,
) -> Result<TransitionPlan> {
  let actor = &request.actor;
  actor.ensure_active()?;
  if !actor.is_admin() && actor.id != assignee_user_id {
    return Err(Error::forbidden(format!(
      "user {} is not assigned to intervention {}",
      actor.id, current.intervention_id
    )));
  }

  let from = current.status;
  let to = request.requested;
  if !from.can_transition_to(to) {
    return Err(Error::InvalidTransition {
      current:    from,
      requested:  to,
      valid_next: from.allowed_next_states().to_vec(),
    });
  }

  let mut next = current.clone();
  next.status = to;
  if let Some(notes) = &request.notes {
    next.notes = Some(notes.clone());
  }

  let alert_status = match to {
    InterventionStatus::SurPlace => {
      next.arrival_time = Some(now);
      None
    }
    InterventionStatus::Terminee => {
      next.end_time = Some(now);
      Some(AlertStatus::Resolved)
    }
    // The emergency is not over just because this team stood down; the alert
    // stays ACCEPTED and may be dispatched again.
    InterventionStatus::Annulee => {
      next.end_time = Some(now);
      None
    }
    InterventionStatus::EnRoute => None,
  };

  Ok(TransitionPlan { intervention: next, previous: from, alert_status })
}
