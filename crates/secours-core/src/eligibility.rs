//! The eligibility filter: which rescue members could take an alert.
//!
//! A member is a candidate when it is on duty, its user account is active,
//! its rescue service is active, and no non-terminal intervention references
//! it. The filter is read-only; the answer is advisory and is re-validated by
//! [`crate::store::EntityStore::dispatch`] before any write.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  Engine, Error, Result,
  alert::Alert,
  error::Entity,
  fanout::PushGateway,
  rescue::{MemberStanding, RescueMember},
  store::EntityStore,
  user::{Principal, Role},
};

/// An external ranking collaborator, e.g. by distance to the alert.
///
/// A ranker may only reorder; members it adds are discarded and members it
/// drops are kept, in primary-key order, after the ranked ones.
pub trait Ranker: Send + Sync {
  fn rank(&self, alert: &Alert, candidates: Vec<RescueMember>) -> Vec<RescueMember>;
}

pub fn is_eligible(standing: &MemberStanding) -> bool {
  standing.member.is_on_duty
    && standing.user_active
    && standing.service_active
    && !standing.busy
}

/// The candidate rescue members for one alert, in preference order.
///
/// Built eagerly from a single read of member standings; iterating it again
/// replays the same snapshot.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Candidates(Vec<RescueMember>);

impl Candidates {
  /// Filter `standings` down to eligible members in primary-key order.
  pub fn from_standings(standings: Vec<MemberStanding>) -> Self {
    let mut members: Vec<RescueMember> = standings
      .into_iter()
      .filter(is_eligible)
      .map(|s| s.member)
      .collect();
    members.sort_by_key(|m| m.rescue_member_id);
    Self(members)
  }

  fn ranked_by(self, ranker: &dyn Ranker, alert: &Alert) -> Self {
    let mut pending: HashSet<Uuid> =
      self.0.iter().map(|m| m.rescue_member_id).collect();
    let mut ordered: Vec<RescueMember> = ranker
      .rank(alert, self.0.clone())
      .into_iter()
      .filter(|m| pending.remove(&m.rescue_member_id))
      .collect();
    ordered.extend(
      self
        .0
        .into_iter()
        .filter(|m| pending.contains(&m.rescue_member_id)),
    );
    Self(ordered)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, RescueMember> { self.0.iter() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn into_inner(self) -> Vec<RescueMember> { self.0 }
}

impl<'a> IntoIterator for &'a Candidates {
  type Item = &'a RescueMember;
  type IntoIter = std::slice::Iter<'a, RescueMember>;

  fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

impl IntoIterator for Candidates {
  type Item = RescueMember;
  type IntoIter = std::vec::IntoIter<RescueMember>;

  fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<S, G> Engine<S, G>
where
  S: EntityStore,
  G: PushGateway,
{
  /// Candidate rescuers for an open alert. Restricted to active
  /// administrators and rescuers; fails with `NotFound` when the alert does
  /// not exist or is already RESOLVED or CANCELLED.
  pub async fn candidates(&self, alert_id: Uuid, actor: Principal) -> Result<Candidates> {
    actor.ensure_active()?;
    if actor.role == Role::Citizen {
      return Err(Error::forbidden("candidate lists are for dispatchers"));
    }
    let alert = self
      .store()
      .get_alert(alert_id)
      .await
      .map_err(Into::into)?
      .filter(|a| !a.status.is_closed())
      .ok_or_else(|| Error::not_found(Entity::Alert, alert_id))?;

    let standings = self.store().member_standings().await.map_err(Into::into)?;
    let candidates = Candidates::from_standings(standings);

    Ok(match self.ranker() {
      Some(ranker) => candidates.ranked_by(ranker, &alert),
      None => candidates,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::alert::{AlertCategory, AlertStatus, Location};

  fn standing(on_duty: bool, user: bool, service: bool, busy: bool) -> MemberStanding {
    MemberStanding {
      member:         RescueMember {
        rescue_member_id: Uuid::new_v4(),
        user_id:          Uuid::new_v4(),
        service_id:       Uuid::new_v4(),
        position:         "firefighter".into(),
        badge_number:     Uuid::new_v4().to_string(),
        is_on_duty:       on_duty,
        created_at:       Utc::now(),
      },
      user_active:    user,
      service_active: service,
      busy,
    }
  }

  fn alert() -> Alert {
    Alert {
      alert_id:    Uuid::new_v4(),
      reporter_id: Uuid::new_v4(),
      location:    Location { lat: 43.3, lng: 5.37 },
      category:    AlertCategory::Fire,
      description: "smoke from a building".into(),
      address:     None,
      status:      AlertStatus::Pending,
      created_at:  Utc::now(),
      updated_at:  Utc::now(),
    }
  }

  #[test]
  fn every_predicate_is_required() {
    assert!(is_eligible(&standing(true, true, true, false)));
    assert!(!is_eligible(&standing(false, true, true, false)));
    assert!(!is_eligible(&standing(true, false, true, false)));
    assert!(!is_eligible(&standing(true, true, false, false)));
    assert!(!is_eligible(&standing(true, true, true, true)));
  }

  #[test]
  fn candidates_are_in_primary_key_order_and_restartable() {
    let standings: Vec<_> = (0..5).map(|_| standing(true, true, true, false)).collect();
    let candidates = Candidates::from_standings(standings);
    let first: Vec<Uuid> = candidates.iter().map(|m| m.rescue_member_id).collect();
    let second: Vec<Uuid> = candidates.iter().map(|m| m.rescue_member_id).collect();
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0] < w[1]));
  }

  struct Reverse;

  impl Ranker for Reverse {
    fn rank(&self, _: &Alert, mut candidates: Vec<RescueMember>) -> Vec<RescueMember> {
      candidates.reverse();
      candidates
    }
  }

  struct Greedy(RescueMember);

  impl Ranker for Greedy {
    fn rank(&self, _: &Alert, candidates: Vec<RescueMember>) -> Vec<RescueMember> {
      // Injects an outsider and forgets everyone but the first.
      vec![self.0.clone(), candidates[0].clone()]
    }
  }

  #[test]
  fn ranker_reorders() {
    let candidates = Candidates::from_standings(
      (0..3).map(|_| standing(true, true, true, false)).collect(),
    );
    let mut expected = candidates.clone().into_inner();
    expected.reverse();
    let ranked = candidates.ranked_by(&Reverse, &alert());
    assert_eq!(ranked.into_inner(), expected);
  }

  #[test]
  fn ranker_cannot_add_or_drop_members() {
    let candidates = Candidates::from_standings(
      (0..3).map(|_| standing(true, true, true, false)).collect(),
    );
    let outsider = standing(true, true, true, false).member;
    let original = candidates.clone().into_inner();
    let ranked = candidates.ranked_by(&Greedy(outsider.clone()), &alert());
    assert_eq!(ranked.len(), 3);
    assert!(ranked.iter().all(|m| m.rescue_member_id != outsider.rescue_member_id));
    assert_eq!(ranked.into_inner(), original);
  }
}
