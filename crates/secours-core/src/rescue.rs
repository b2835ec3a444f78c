//! Rescue services (organisations) and their rescue members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  user::{Role, User},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueService {
  pub service_id: Uuid,
  pub name:       String,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
}

/// A rescuer profile, bound 1:1 to a user account and to exactly one
/// [`RescueService`].
///
/// `is_on_duty` is operator-controlled and says nothing about assignment: an
/// on-duty rescuer may still be busy with an intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescueMember {
  pub rescue_member_id: Uuid,
  pub user_id:          Uuid,
  pub service_id:       Uuid,
  pub position:         String,
  pub badge_number:     String,
  pub is_on_duty:       bool,
  pub created_at:       DateTime<Utc>,
}

/// Input to [`crate::store::EntityStore::add_rescue_member`]. Members start
/// off duty.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRescueMember {
  pub user_id:      Uuid,
  pub service_id:   Uuid,
  pub position:     String,
  pub badge_number: String,
}

impl NewRescueMember {
  pub fn validate(&self) -> Result<()> {
    if self.badge_number.trim().is_empty() {
      return Err(Error::validation("badgeNumber must not be empty"));
    }
    if self.position.trim().is_empty() {
      return Err(Error::validation("position must not be empty"));
    }
    Ok(())
  }

  /// Checked by the store, inside its transaction, against the account the
  /// profile will be bound to.
  pub fn check_account(&self, user: &User) -> Result<()> {
    if user.role != Role::Rescue {
      return Err(Error::validation(format!(
        "user {} has role {}, expected {}",
        user.user_id,
        user.role,
        Role::Rescue
      )));
    }
    Ok(())
  }
}

/// A rescue member together with everything the eligibility filter needs to
/// judge it, read in one consistent snapshot.
#[derive(Debug, Clone)]
pub struct MemberStanding {
  pub member:         RescueMember,
  pub user_active:    bool,
  pub service_active: bool,
  /// The member is referenced by a non-terminal intervention.
  pub busy:           bool,
}
