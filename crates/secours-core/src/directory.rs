//! Administrative operations around the core: accounts, rescue services,
//! rescuer profiles, push identifiers, and alert intake and cancellation.

use uuid::Uuid;

use crate::{
  Engine, Error, Result,
  alert::{Alert, AlertCategory, Location, NewAlert},
  audit,
  error::Entity,
  fanout::PushGateway,
  rescue::{NewRescueMember, RescueMember, RescueService},
  store::EntityStore,
  user::{NewUser, Principal, Role, User},
};

/// What a citizen submits; the reporter is always the acting principal.
#[derive(Debug, Clone)]
pub struct AlertReport {
  pub location:    Location,
  pub category:    AlertCategory,
  pub description: String,
  pub address:     Option<String>,
}

impl<S, G> Engine<S, G>
where
  S: EntityStore,
  G: PushGateway,
{
  // ── Users ─────────────────────────────────────────────────────────────

  pub async fn create_user(&self, actor: Principal, input: NewUser) -> Result<User> {
    actor.ensure_admin()?;
    input.validate()?;
    self.store().add_user(input).await.map_err(Into::into)
  }

  pub async fn set_user_active(
    &self,
    actor: Principal,
    user_id: Uuid,
    active: bool,
  ) -> Result<User> {
    actor.ensure_admin()?;
    self
      .store()
      .set_user_active(user_id, active)
      .await
      .map_err(Into::into)
  }

  /// Users register their own devices; administrators may register any.
  pub async fn register_push_identifier(
    &self,
    actor: Principal,
    user_id: Uuid,
    external_id: String,
  ) -> Result<()> {
    actor.ensure_active()?;
    if actor.id != user_id && !actor.is_admin() {
      return Err(Error::forbidden("cannot register devices for another user"));
    }
    let external_id = external_id.trim().to_owned();
    if external_id.is_empty() {
      return Err(Error::validation("externalId must not be empty"));
    }
    self.require_user(user_id).await?;
    self
      .store()
      .add_push_identifier(user_id, external_id)
      .await
      .map_err(Into::into)
  }

  async fn require_user(&self, user_id: Uuid) -> Result<User> {
    self
      .store()
      .get_user(user_id)
      .await
      .map_err(Into::into)?
      .ok_or_else(|| Error::not_found(Entity::User, user_id))
  }

  // ── Rescue services and members ───────────────────────────────────────

  pub async fn create_rescue_service(
    &self,
    actor: Principal,
    name: String,
  ) -> Result<RescueService> {
    actor.ensure_admin()?;
    let name = name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::validation("name must not be empty"));
    }
    self.store().add_rescue_service(name).await.map_err(Into::into)
  }

  pub async fn set_rescue_service_active(
    &self,
    actor: Principal,
    service_id: Uuid,
    active: bool,
  ) -> Result<RescueService> {
    actor.ensure_admin()?;
    self
      .store()
      .set_rescue_service_active(service_id, active)
      .await
      .map_err(Into::into)
  }

  pub async fn register_rescue_member(
    &self,
    actor: Principal,
    input: NewRescueMember,
  ) -> Result<RescueMember> {
    actor.ensure_admin()?;
    input.validate()?;
    self.store().add_rescue_member(input).await.map_err(Into::into)
  }

  /// Toggle duty. Allowed for the rescuer's own account and administrators.
  pub async fn set_on_duty(
    &self,
    actor: Principal,
    rescue_member_id: Uuid,
    on_duty: bool,
  ) -> Result<RescueMember> {
    actor.ensure_active()?;
    let member = self
      .store()
      .get_rescue_member(rescue_member_id)
      .await
      .map_err(Into::into)?
      .ok_or_else(|| Error::not_found(Entity::RescueMember, rescue_member_id))?;
    if member.user_id != actor.id && !actor.is_admin() {
      return Err(Error::forbidden("cannot change another rescuer's duty status"));
    }
    tracing::info!(%rescue_member_id, on_duty, "duty status changed");
    self
      .store()
      .set_on_duty(rescue_member_id, on_duty)
      .await
      .map_err(Into::into)
  }

  // ── Alerts ────────────────────────────────────────────────────────────

  /// Record a PENDING alert reported by `actor`.
  pub async fn submit_alert(&self, actor: Principal, report: AlertReport) -> Result<Alert> {
    actor.ensure_active()?;
    let input = NewAlert {
      reporter_id: actor.id,
      location:    report.location,
      category:    report.category,
      description: report.description,
      address:     report.address,
    };
    input.validate()?;
    let alert = self.store().add_alert(input).await.map_err(Into::into)?;
    tracing::info!(
      alert_id = %alert.alert_id,
      category = %alert.category,
      "alert submitted"
    );
    Ok(alert)
  }

  /// Read one alert. Visible to its reporter, rescuers and administrators.
  pub async fn alert(&self, alert_id: Uuid, actor: Principal) -> Result<Alert> {
    actor.ensure_active()?;
    let alert = self
      .store()
      .get_alert(alert_id)
      .await
      .map_err(Into::into)?
      .ok_or_else(|| Error::not_found(Entity::Alert, alert_id))?;
    let visible = match actor.role {
      Role::Admin | Role::Rescue => true,
      Role::Citizen => alert.reporter_id == actor.id,
    };
    if !visible {
      return Err(Error::forbidden(format!("alert {alert_id} belongs to another user")));
    }
    Ok(alert)
  }

  /// Administratively close an alert that no one is working on.
  pub async fn cancel_alert(&self, alert_id: Uuid, actor: Principal) -> Result<Alert> {
    audit::boundary(
      "cancel_alert",
      alert_id,
      actor.id,
      self.cancel_alert_inner(alert_id, actor),
    )
    .await
  }

  async fn cancel_alert_inner(&self, alert_id: Uuid, actor: Principal) -> Result<Alert> {
    actor.ensure_admin()?;
    self.store().cancel_alert(alert_id).await.map_err(Into::into)
  }
}
