//! Driving interventions through the state machine.
//!
//! Legality and authorization live in
//! [`crate::intervention::plan_transition`]; this module is the engine-facing
//! entry point that hands the request to the store and, once committed, to
//! the fan-out.

use serde::Serialize;
use uuid::Uuid;

use crate::{
  Engine, Error, Result,
  alert::Alert,
  audit,
  error::Entity,
  fanout::{FanoutEvent, PushGateway},
  intervention::{Intervention, InterventionStatus, TransitionRequest},
  store::EntityStore,
  user::Principal,
};

/// The committed result of a transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transitioned {
  pub intervention: Intervention,
  pub previous:     InterventionStatus,
  /// The linked alert after any cascade.
  pub alert:        Alert,
  pub acted_by:     Uuid,
}

impl<S, G> Engine<S, G>
where
  S: EntityStore,
  G: PushGateway,
{
  /// Move an intervention to `requested`.
  ///
  /// Side effects are applied atomically with the status write: arrival time
  /// on SUR_PLACE, end time on TERMINEE or ANNULEE, and the alert becomes
  /// RESOLVED on TERMINEE. The reporter is notified after the commit.
  pub async fn transition(
    &self,
    intervention_id: Uuid,
    requested: InterventionStatus,
    actor: Principal,
    notes: Option<String>,
  ) -> Result<Intervention> {
    audit::boundary(
      "transition",
      intervention_id,
      actor.id,
      self.transition_inner(TransitionRequest {
        intervention_id,
        requested,
        actor,
        notes,
      }),
    )
    .await
  }

  async fn transition_inner(
    &self,
    request: TransitionRequest,
  ) -> Result<Intervention> {
    let transitioned = self
      .store()
      .apply_transition(request)
      .await
      .map_err(Into::into)?;

    tracing::debug!(
      intervention_id = %transitioned.intervention.intervention_id,
      from = %transitioned.previous,
      to = %transitioned.intervention.status,
      alert_status = %transitioned.alert.status,
      "intervention transitioned"
    );

    let intervention = transitioned.intervention.clone();
    self.fanout().publish(FanoutEvent::Transitioned(transitioned));
    Ok(intervention)
  }

  /// Read one intervention. Visible to administrators, rescuers, and the
  /// reporter of the linked alert.
  pub async fn intervention(
    &self,
    id: Uuid,
    actor: Principal,
  ) -> Result<Intervention> {
    actor.ensure_active()?;
    let intervention = self
      .store()
      .get_intervention(id)
      .await
      .map_err(Into::into)?
      .ok_or_else(|| Error::not_found(Entity::Intervention, id))?;
    self.alert(intervention.alert_id, actor).await?;
    Ok(intervention)
  }

  /// Every dispatch episode of an alert, oldest first.
  pub async fn interventions_for_alert(
    &self,
    alert_id: Uuid,
    actor: Principal,
  ) -> Result<Vec<Intervention>> {
    self.alert(alert_id, actor).await?;
    self
      .store()
      .interventions_for_alert(alert_id)
      .await
      .map_err(Into::into)
  }
}
