//! Test doubles for exercising the notifier and the fan-out worker without a
//! database.

use std::{
  collections::HashMap,
  sync::Mutex,
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, Result,
  alert::{Alert, NewAlert},
  dispatch::Dispatched,
  error::Entity,
  fanout::{PushGateway, PushMessage, PushReceipt},
  intervention::{Intervention, NewIntervention, TransitionRequest},
  lifecycle::Transitioned,
  notification::{MassTarget, NewNotification, Notification},
  rescue::{MemberStanding, NewRescueMember, RescueMember, RescueService},
  store::EntityStore,
  user::{NewUser, Role, User},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Users, push identifiers and notifications only; every other method panics.
#[derive(Default)]
pub struct MemoryStore {
  users:         Mutex<HashMap<Uuid, User>>,
  push_ids:      Mutex<Vec<(Uuid, String)>>,
  notifications: Mutex<Vec<Notification>>,
}

impl MemoryStore {
  pub fn notifications(&self) -> Vec<Notification> {
    self.notifications.lock().unwrap().clone()
  }
}

impl EntityStore for MemoryStore {
  type Error = Error;

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:      Uuid::new_v4(),
      display_name: input.display_name,
      role:         input.role,
      is_active:    true,
      created_at:   Utc::now(),
    };
    self.users.lock().unwrap().insert(user.user_id, user.clone());
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.users.lock().unwrap().get(&id).cloned())
  }

  async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User> {
    let mut users = self.users.lock().unwrap();
    let user = users
      .get_mut(&id)
      .ok_or_else(|| Error::not_found(Entity::User, id))?;
    user.is_active = active;
    Ok(user.clone())
  }

  async fn add_push_identifier(&self, user_id: Uuid, external_id: String) -> Result<()> {
    self.push_ids.lock().unwrap().push((user_id, external_id));
    Ok(())
  }

  async fn push_identifiers_for_user(&self, user_id: Uuid) -> Result<Vec<String>> {
    Ok(
      self
        .push_ids
        .lock()
        .unwrap()
        .iter()
        .filter(|(u, _)| *u == user_id)
        .map(|(_, id)| id.clone())
        .collect(),
    )
  }

  async fn push_identifiers_for_role(&self, role: Role) -> Result<Vec<String>> {
    let users = self.users.lock().unwrap();
    Ok(
      self
        .push_ids
        .lock()
        .unwrap()
        .iter()
        .filter(|(u, _)| users.get(u).is_some_and(|u| u.role == role && u.is_active))
        .map(|(_, id)| id.clone())
        .collect(),
    )
  }

  async fn add_rescue_service(&self, _: String) -> Result<RescueService> { unimplemented!() }
  async fn get_rescue_service(&self, _: Uuid) -> Result<Option<RescueService>> { unimplemented!() }
  async fn set_rescue_service_active(&self, _: Uuid, _: bool) -> Result<RescueService> { unimplemented!() }
  async fn add_rescue_member(&self, _: NewRescueMember) -> Result<RescueMember> { unimplemented!() }
  async fn get_rescue_member(&self, _: Uuid) -> Result<Option<RescueMember>> { unimplemented!() }
  async fn set_on_duty(&self, _: Uuid, _: bool) -> Result<RescueMember> { unimplemented!() }
  async fn member_standings(&self) -> Result<Vec<MemberStanding>> { unimplemented!() }
  async fn add_alert(&self, _: NewAlert) -> Result<Alert> { unimplemented!() }
  async fn get_alert(&self, _: Uuid) -> Result<Option<Alert>> { unimplemented!() }
  async fn cancel_alert(&self, _: Uuid) -> Result<Alert> { unimplemented!() }
  async fn dispatch(&self, _: NewIntervention) -> Result<Dispatched> { unimplemented!() }
  async fn get_intervention(&self, _: Uuid) -> Result<Option<Intervention>> { unimplemented!() }
  async fn interventions_for_alert(&self, _: Uuid) -> Result<Vec<Intervention>> { unimplemented!() }
  async fn apply_transition(&self, _: TransitionRequest) -> Result<Transitioned> { unimplemented!() }

  async fn add_notification(&self, input: NewNotification) -> Result<Notification> {
    let n = Notification {
      notification_id: Uuid::new_v4(),
      sender_id:       input.sender_id,
      title:           input.title,
      message:         input.message,
      audience:        input.audience,
      is_read:         false,
      created_at:      Utc::now(),
    };
    self.notifications.lock().unwrap().push(n.clone());
    Ok(n)
  }

  async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>> {
    Ok(
      self
        .notifications
        .lock()
        .unwrap()
        .iter()
        .find(|n| n.notification_id == id)
        .cloned(),
    )
  }

  async fn unread_notifications(
    &self,
    user_id: Uuid,
    target: Option<MassTarget>,
  ) -> Result<Vec<Notification>> {
    Ok(
      self
        .notifications
        .lock()
        .unwrap()
        .iter()
        .filter(|n| !n.is_read)
        .filter(|n| {
          n.audience.recipient_id() == Some(user_id)
            || (target.is_some() && n.audience.target() == target)
        })
        .cloned()
        .collect(),
    )
  }

  async fn mark_read(&self, id: Uuid) -> Result<Notification> {
    let mut all = self.notifications.lock().unwrap();
    let n = all
      .iter_mut()
      .find(|n| n.notification_id == id)
      .ok_or_else(|| Error::not_found(Entity::Notification, id))?;
    n.is_read = true;
    Ok(n.clone())
  }
}

// ─── Gateways ────────────────────────────────────────────────────────────────

/// Accepts every message and remembers it.
#[derive(Default)]
pub struct RecordingGateway {
  sent: Mutex<Vec<PushMessage>>,
}

impl RecordingGateway {
  pub fn sent(&self) -> Vec<PushMessage> { self.sent.lock().unwrap().clone() }
}

impl PushGateway for RecordingGateway {
  async fn send(&self, message: PushMessage) -> Result<PushReceipt> {
    self.sent.lock().unwrap().push(message);
    Ok(PushReceipt { id: Uuid::new_v4().to_string() })
  }
}

/// Always reports a provider error.
pub struct FailingGateway;

impl PushGateway for FailingGateway {
  async fn send(&self, _: PushMessage) -> Result<PushReceipt> {
    Err(Error::DependencyFailure("provider returned 503".into()))
  }
}

/// Never answers.
pub struct StallingGateway;

impl PushGateway for StallingGateway {
  async fn send(&self, _: PushMessage) -> Result<PushReceipt> {
    std::future::pending().await
  }
}
