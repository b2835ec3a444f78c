//! Notifications — durable records of directed or broadcast messages.
//!
//! A notification addresses either exactly one user ([`Audience::Unique`]) or
//! every user of a role ([`Audience::Mass`]); the enum makes "exactly one of
//! recipient or target" unrepresentable any other way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Engine, Error, Result,
  error::Entity,
  fanout::PushGateway,
  store::EntityStore,
  user::{Principal, Role},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
  Unique,
  Mass,
}

/// The population a mass notification is broadcast to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MassTarget {
  Rescue,
  Citizen,
}

impl MassTarget {
  pub fn role(self) -> Role {
    match self {
      Self::Rescue => Role::Rescue,
      Self::Citizen => Role::Citizen,
    }
  }

  /// Administrators are never the target of a broadcast.
  pub fn for_role(role: Role) -> Option<Self> {
    match role {
      Role::Rescue => Some(Self::Rescue),
      Role::Citizen => Some(Self::Citizen),
      Role::Admin => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
  tag = "type",
  rename_all = "SCREAMING_SNAKE_CASE",
  rename_all_fields = "camelCase"
)]
pub enum Audience {
  Unique { recipient_id: Uuid },
  Mass { target: MassTarget },
}

impl Audience {
  pub fn kind(&self) -> NotificationType {
    match self {
      Self::Unique { .. } => NotificationType::Unique,
      Self::Mass { .. } => NotificationType::Mass,
    }
  }

  pub fn recipient_id(&self) -> Option<Uuid> {
    match self {
      Self::Unique { recipient_id } => Some(*recipient_id),
      Self::Mass { .. } => None,
    }
  }

  pub fn target(&self) -> Option<MassTarget> {
    match self {
      Self::Unique { .. } => None,
      Self::Mass { target } => Some(*target),
    }
  }

  /// Rebuild from the flat `(type, recipient_id, target)` columns, rejecting
  /// rows where the populated field does not match the type.
  pub fn from_parts(
    kind: NotificationType,
    recipient_id: Option<Uuid>,
    target: Option<MassTarget>,
  ) -> Result<Self> {
    match (kind, recipient_id, target) {
      (NotificationType::Unique, Some(recipient_id), None) => {
        Ok(Self::Unique { recipient_id })
      }
      (NotificationType::Mass, None, Some(target)) => Ok(Self::Mass { target }),
      (kind, r, t) => Err(Error::validation(format!(
        "{kind} notification cannot have recipient {r:?} and target {t:?}"
      ))),
    }
  }

  /// Whether `principal` is one of the addressees.
  pub fn reaches(&self, principal: &Principal) -> bool {
    match self {
      Self::Unique { recipient_id } => *recipient_id == principal.id,
      Self::Mass { target } => target.role() == principal.role,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub notification_id: Uuid,
  pub sender_id:       Uuid,
  pub title:           Option<String>,
  pub message:         String,
  #[serde(flatten)]
  pub audience:        Audience,
  pub is_read:         bool,
  pub created_at:      DateTime<Utc>,
}

/// Input to [`crate::store::EntityStore::add_notification`]. Notifications
/// start unread.
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub sender_id: Uuid,
  pub title:     Option<String>,
  pub message:   String,
  pub audience:  Audience,
}

// ─── Engine operations ───────────────────────────────────────────────────────

impl<S, G> Engine<S, G>
where
  S: EntityStore,
  G: PushGateway,
{
  /// Send a direct administrative notification.
  pub async fn notify(
    &self,
    actor: Principal,
    audience: Audience,
    message: String,
    title: Option<String>,
  ) -> Result<Notification> {
    actor.ensure_admin()?;
    if message.trim().is_empty() {
      return Err(Error::validation("message must not be empty"));
    }
    match audience {
      Audience::Unique { recipient_id } => {
        self
          .notifier()
          .notify_unique(actor.id, recipient_id, message, title)
          .await
      }
      Audience::Mass { target } => {
        self.notifier().notify_mass(actor.id, target, message, title).await
      }
    }
  }

  pub async fn unread_notifications(&self, actor: Principal) -> Result<Vec<Notification>> {
    actor.ensure_active()?;
    self.notifier().unread_for(actor.id).await
  }

  /// Mark a notification read on behalf of one of its addressees.
  pub async fn mark_notification_read(
    &self,
    notification_id: Uuid,
    actor: Principal,
  ) -> Result<Notification> {
    actor.ensure_active()?;
    let notification = self
      .store()
      .get_notification(notification_id)
      .await
      .map_err(Into::into)?
      .ok_or_else(|| Error::not_found(Entity::Notification, notification_id))?;
    if !notification.audience.reaches(&actor) && !actor.is_admin() {
      return Err(Error::forbidden("notification is addressed to someone else"));
    }
    self.notifier().mark_read(notification_id).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn audience_flattens_onto_the_notification() {
    let recipient_id = Uuid::new_v4();
    let n = Notification {
      notification_id: Uuid::new_v4(),
      sender_id:       Uuid::new_v4(),
      title:           None,
      message:         "team on site".into(),
      audience:        Audience::Unique { recipient_id },
      is_read:         false,
      created_at:      Utc::now(),
    };
    let json = serde_json::to_value(&n).unwrap();
    assert_eq!(json["type"], "UNIQUE");
    assert_eq!(json["recipientId"], recipient_id.to_string());
    assert!(json.get("target").is_none());

    let back: Notification = serde_json::from_value(json).unwrap();
    assert_eq!(back.audience, n.audience);
  }

  #[test]
  fn mismatched_columns_are_rejected() {
    assert!(
      Audience::from_parts(NotificationType::Mass, Some(Uuid::new_v4()), None)
        .is_err()
    );
    assert!(
      Audience::from_parts(
        NotificationType::Unique,
        Some(Uuid::new_v4()),
        Some(MassTarget::Citizen)
      )
      .is_err()
    );
    assert_eq!(
      Audience::from_parts(NotificationType::Mass, None, Some(MassTarget::Rescue))
        .unwrap(),
      Audience::Mass { target: MassTarget::Rescue }
    );
  }

  #[test]
  fn mass_reaches_every_member_of_the_role() {
    let audience = Audience::Mass { target: MassTarget::Citizen };
    let citizen = Principal { id: Uuid::new_v4(), role: Role::Citizen, is_active: true };
    let rescuer = Principal { id: Uuid::new_v4(), role: Role::Rescue, is_active: true };
    assert!(audience.reaches(&citizen));
    assert!(!audience.reaches(&rescuer));
  }
}
