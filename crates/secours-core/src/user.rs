//! Users and the authenticated principal.
//!
//! Credentials and token issuance live outside this crate. The engine only
//! ever sees a [`Principal`] that an upstream collaborator has already
//! authenticated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// The role a user account plays on the platform.
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
pub enum Role {
  Admin,
  Rescue,
  Citizen,
}

/// A user account as known to the entity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub user_id:      Uuid,
  pub display_name: String,
  pub role:         Role,
  pub is_active:    bool,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::EntityStore::add_user`]. Accounts start active.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
  pub display_name: String,
  pub role:         Role,
}

impl NewUser {
  pub fn validate(&self) -> Result<()> {
    if self.display_name.trim().is_empty() {
      return Err(Error::validation("displayName must not be empty"));
    }
    Ok(())
  }
}

/// The already-authenticated identity acting on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
  pub id:        Uuid,
  pub role:      Role,
  pub is_active: bool,
}

impl Principal {
  pub fn is_admin(&self) -> bool { self.role == Role::Admin }

  /// Fails with `Forbidden` for deactivated accounts.
  pub fn ensure_active(&self) -> Result<()> {
    if self.is_active {
      Ok(())
    } else {
      Err(Error::forbidden(format!("account {} is inactive", self.id)))
    }
  }

  /// Fails with `Forbidden` unless this is an active administrator.
  pub fn ensure_admin(&self) -> Result<()> {
    self.ensure_active()?;
    if self.is_admin() {
      Ok(())
    } else {
      Err(Error::forbidden("administrator role required"))
    }
  }
}

impl From<&User> for Principal {
  fn from(u: &User) -> Self {
    Self {
      id:        u.user_id,
      role:      u.role,
      is_active: u.is_active,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn principal(role: Role, is_active: bool) -> Principal {
    Principal { id: Uuid::new_v4(), role, is_active }
  }

  #[test]
  fn inactive_admin_is_not_admin_enough() {
    let p = principal(Role::Admin, false);
    assert!(matches!(p.ensure_admin(), Err(Error::Forbidden(_))));
  }

  #[test]
  fn citizen_is_not_admin() {
    let p = principal(Role::Citizen, true);
    assert!(matches!(p.ensure_admin(), Err(Error::Forbidden(_))));
    assert!(p.ensure_active().is_ok());
  }

  #[test]
  fn role_wire_format() {
    assert_eq!(Role::Rescue.to_string(), "RESCUE");
    assert_eq!("CITIZEN".parse::<Role>().unwrap(), Role::Citizen);
    assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
  }
}
