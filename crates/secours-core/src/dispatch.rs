//! The dispatch coordinator: binding an alert to a rescue member.
//!
//! [`check_preconditions`] is pure and is evaluated by the store *inside* the
//! transaction that inserts the intervention, so the check and the write
//! observe the same state. The store additionally carries uniqueness
//! constraints over active interventions, so two concurrent dispatches for the
//! same alert or rescuer cannot both commit.

use uuid::Uuid;

use crate::{
  Engine, Error, Result,
  alert::Alert,
  audit,
  error::{ConflictReason, IneligibleReason},
  fanout::{FanoutEvent, PushGateway},
  intervention::{Intervention, NewIntervention},
  rescue::RescueMember,
  store::EntityStore,
  user::Principal,
};

/// Everything the coordinator needs to judge a proposed pairing, as read
/// inside the dispatch transaction.
#[derive(Debug, Clone)]
pub struct DispatchContext {
  pub alert:                          Alert,
  pub member:                         RescueMember,
  pub member_user_active:             bool,
  pub member_service_active:          bool,
  pub alert_has_active_intervention:  bool,
  pub member_has_active_intervention: bool,
}

/// Preconditions, in order: the alert is open, the alert is not already
/// being handled, the rescuer is on duty with an active account in an active
/// service, the rescuer is free.
pub fn check_preconditions(ctx: &DispatchContext) -> Result<()> {
  if ctx.alert.status.is_closed() {
    return Err(Error::Conflict(ConflictReason::AlertClosed));
  }
  if ctx.alert_has_active_intervention {
    return Err(Error::Conflict(ConflictReason::AlertAlreadyDispatched));
  }
  if !ctx.member.is_on_duty {
    return Err(Error::InvalidTarget {
      id:     ctx.member.rescue_member_id,
      reason: IneligibleReason::OffDuty,
    });
  }
  if !ctx.member_user_active {
    return Err(Error::InvalidTarget {
      id:     ctx.member.rescue_member_id,
      reason: IneligibleReason::AccountInactive,
    });
  }
  if !ctx.member_service_active {
    return Err(Error::InvalidTarget {
      id:     ctx.member.rescue_member_id,
      reason: IneligibleReason::ServiceInactive,
    });
  }
  if ctx.member_has_active_intervention {
    return Err(Error::Conflict(ConflictReason::RescuerBusy));
  }
  Ok(())
}

/// The committed result of a dispatch.
#[derive(Debug, Clone)]
pub struct Dispatched {
  pub intervention: Intervention,
  /// The alert as it stands after the dispatch (ACCEPTED).
  pub alert:        Alert,
  pub member:       RescueMember,
}

impl<S, G> Engine<S, G>
where
  S: EntityStore,
  G: PushGateway,
{
  /// Atomically create an EN_ROUTE intervention for `alert_id` and
  /// `rescue_member_id` and move the alert to ACCEPTED.
  ///
  /// The rescuer and the reporter are notified after the commit; delivery
  /// problems never surface here.
  pub async fn dispatch(
    &self,
    alert_id: Uuid,
    rescue_member_id: Uuid,
    dispatched_by: Principal,
  ) -> Result<Intervention> {
    audit::boundary(
      "dispatch",
      alert_id,
      dispatched_by.id,
      self.dispatch_inner(alert_id, rescue_member_id, dispatched_by),
    )
    .await
  }

  async fn dispatch_inner(
    &self,
    alert_id: Uuid,
    rescue_member_id: Uuid,
    dispatched_by: Principal,
  ) -> Result<Intervention> {
    dispatched_by.ensure_admin()?;

    let dispatched = self
      .store()
      .dispatch(NewIntervention {
        alert_id,
        rescue_member_id,
        dispatched_by: dispatched_by.id,
      })
      .await
      .map_err(Into::into)?;

    let intervention = dispatched.intervention.clone();
    self.fanout().publish(FanoutEvent::Dispatched(dispatched));
    Ok(intervention)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::alert::{AlertCategory, AlertStatus, Location};

  fn context() -> DispatchContext {
    let now = Utc::now();
    DispatchContext {
      alert:                          Alert {
        alert_id:    Uuid::new_v4(),
        reporter_id: Uuid::new_v4(),
        location:    Location { lat: 45.76, lng: 4.83 },
        category:    AlertCategory::Medical,
        description: "person unconscious".into(),
        address:     None,
        status:      AlertStatus::Pending,
        created_at:  now,
        updated_at:  now,
      },
      member:                         RescueMember {
        rescue_member_id: Uuid::new_v4(),
        user_id:          Uuid::new_v4(),
        service_id:       Uuid::new_v4(),
        position:         "paramedic".into(),
        badge_number:     "B-001".into(),
        is_on_duty:       true,
        created_at:       now,
      },
      member_user_active:             true,
      member_service_active:          true,
      alert_has_active_intervention:  false,
      member_has_active_intervention: false,
    }
  }

  #[test]
  fn open_alert_and_free_rescuer_pass() {
    assert!(check_preconditions(&context()).is_ok());
  }

  #[test]
  fn accepted_alert_without_active_intervention_is_dispatchable() {
    let mut ctx = context();
    ctx.alert.status = AlertStatus::Accepted;
    assert!(check_preconditions(&ctx).is_ok());
  }

  #[test]
  fn closed_alert_is_a_conflict() {
    for status in [AlertStatus::Resolved, AlertStatus::Cancelled] {
      let mut ctx = context();
      ctx.alert.status = status;
      assert!(matches!(
        check_preconditions(&ctx),
        Err(Error::Conflict(ConflictReason::AlertClosed))
      ));
    }
  }

  #[test]
  fn busy_alert_and_busy_rescuer_are_distinguished() {
    let mut ctx = context();
    ctx.alert_has_active_intervention = true;
    assert!(matches!(
      check_preconditions(&ctx),
      Err(Error::Conflict(ConflictReason::AlertAlreadyDispatched))
    ));

    let mut ctx = context();
    ctx.member_has_active_intervention = true;
    assert!(matches!(
      check_preconditions(&ctx),
      Err(Error::Conflict(ConflictReason::RescuerBusy))
    ));
  }

  #[test]
  fn off_duty_or_inactive_rescuer_is_an_invalid_target() {
    let mut ctx = context();
    ctx.member.is_on_duty = false;
    assert!(matches!(
      check_preconditions(&ctx),
      Err(Error::InvalidTarget { reason: IneligibleReason::OffDuty, .. })
    ));

    let mut ctx = context();
    ctx.member_user_active = false;
    assert!(matches!(
      check_preconditions(&ctx),
      Err(Error::InvalidTarget { reason: IneligibleReason::AccountInactive, .. })
    ));

    let mut ctx = context();
    ctx.member_service_active = false;
    assert!(matches!(
      check_preconditions(&ctx),
      Err(Error::InvalidTarget { reason: IneligibleReason::ServiceInactive, .. })
    ));
  }
}
