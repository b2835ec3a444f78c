//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision and a
//! `Z` suffix, so lexical order is chronological order. Enumerations are
//! stored as their SCREAMING_SNAKE_CASE wire names. UUIDs are stored as
//! hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use secours_core::{
  alert::{Alert, Location},
  intervention::Intervention,
  notification::{Audience, Notification},
  rescue::{RescueMember, RescueService},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Enumerations ────────────────────────────────────────────────────────────

pub fn encode_enum<T>(value: T) -> &'static str
where
  T: Into<&'static str>,
{
  value.into()
}

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::UnknownVariant {
    column,
    value: s.to_owned(),
  })
}

fn decode_opt_enum<T: FromStr>(
  column: &'static str,
  s: Option<&str>,
) -> Result<Option<T>> {
  s.map(|s| decode_enum(column, s)).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, display_name, role, is_active, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:      String,
  pub display_name: String,
  pub role:         String,
  pub is_active:    bool,
  pub created_at:   String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      display_name: row.get(1)?,
      role:         row.get(2)?,
      is_active:    row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:      decode_uuid(&self.user_id)?,
      display_name: self.display_name,
      role:         decode_enum("role", &self.role)?,
      is_active:    self.is_active,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const SERVICE_COLUMNS: &str = "service_id, name, is_active, created_at";

/// Raw values read directly from a `rescue_services` row.
pub struct RawService {
  pub service_id: String,
  pub name:       String,
  pub is_active:  bool,
  pub created_at: String,
}

impl RawService {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      service_id: row.get(0)?,
      name:       row.get(1)?,
      is_active:  row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_service(self) -> Result<RescueService> {
    Ok(RescueService {
      service_id: decode_uuid(&self.service_id)?,
      name:       self.name,
      is_active:  self.is_active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const MEMBER_COLUMNS: &str = "rescue_member_id, user_id, service_id, position, \
                                  badge_number, is_on_duty, created_at";

/// Raw values read directly from a `rescue_members` row.
pub struct RawMember {
  pub rescue_member_id: String,
  pub user_id:          String,
  pub service_id:       String,
  pub position:         String,
  pub badge_number:     String,
  pub is_on_duty:       bool,
  pub created_at:       String,
}

impl RawMember {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rescue_member_id: row.get(0)?,
      user_id:          row.get(1)?,
      service_id:       row.get(2)?,
      position:         row.get(3)?,
      badge_number:     row.get(4)?,
      is_on_duty:       row.get(5)?,
      created_at:       row.get(6)?,
    })
  }

  pub fn into_member(self) -> Result<RescueMember> {
    Ok(RescueMember {
      rescue_member_id: decode_uuid(&self.rescue_member_id)?,
      user_id:          decode_uuid(&self.user_id)?,
      service_id:       decode_uuid(&self.service_id)?,
      position:         self.position,
      badge_number:     self.badge_number,
      is_on_duty:       self.is_on_duty,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub const ALERT_COLUMNS: &str = "alert_id, reporter_id, latitude, longitude, category, \
                                 description, address, status, created_at, updated_at";

/// Raw values read directly from an `alerts` row.
pub struct RawAlert {
  pub alert_id:    String,
  pub reporter_id: String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub category:    String,
  pub description: String,
  pub address:     Option<String>,
  pub status:      String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawAlert {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:    row.get(0)?,
      reporter_id: row.get(1)?,
      latitude:    row.get(2)?,
      longitude:   row.get(3)?,
      category:    row.get(4)?,
      description: row.get(5)?,
      address:     row.get(6)?,
      status:      row.get(7)?,
      created_at:  row.get(8)?,
      updated_at:  row.get(9)?,
    })
  }

  pub fn into_alert(self) -> Result<Alert> {
    Ok(Alert {
      alert_id:    decode_uuid(&self.alert_id)?,
      reporter_id: decode_uuid(&self.reporter_id)?,
      location:    Location { lat: self.latitude, lng: self.longitude },
      category:    decode_enum("category", &self.category)?,
      description: self.description,
      address:     self.address,
      status:      decode_enum("alert status", &self.status)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const INTERVENTION_COLUMNS: &str = "intervention_id, alert_id, rescue_member_id, \
                                        dispatched_by, status, start_time, \
                                        arrival_time, end_time, notes";

/// Raw values read directly from an `interventions` row.
pub struct RawIntervention {
  pub intervention_id:  String,
  pub alert_id:         String,
  pub rescue_member_id: String,
  pub dispatched_by:    String,
  pub status:           String,
  pub start_time:       String,
  pub arrival_time:     Option<String>,
  pub end_time:         Option<String>,
  pub notes:            Option<String>,
}

impl RawIntervention {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      intervention_id:  row.get(0)?,
      alert_id:         row.get(1)?,
      rescue_member_id: row.get(2)?,
      dispatched_by:    row.get(3)?,
      status:           row.get(4)?,
      start_time:       row.get(5)?,
      arrival_time:     row.get(6)?,
      end_time:         row.get(7)?,
      notes:            row.get(8)?,
    })
  }

  pub fn into_intervention(self) -> Result<Intervention> {
    Ok(Intervention {
      intervention_id:  decode_uuid(&self.intervention_id)?,
      alert_id:         decode_uuid(&self.alert_id)?,
      rescue_member_id: decode_uuid(&self.rescue_member_id)?,
      dispatched_by:    decode_uuid(&self.dispatched_by)?,
      status:           decode_enum("intervention status", &self.status)?,
      start_time:       decode_dt(&self.start_time)?,
      arrival_time:     decode_opt_dt(self.arrival_time.as_deref())?,
      end_time:         decode_opt_dt(self.end_time.as_deref())?,
      notes:            self.notes,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str = "notification_id, sender_id, title, message, \
                                        notification_type, recipient_id, target, \
                                        is_read, created_at";

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id:   String,
  pub sender_id:         String,
  pub title:             Option<String>,
  pub message:           String,
  pub notification_type: String,
  pub recipient_id:      Option<String>,
  pub target:            Option<String>,
  pub is_read:           bool,
  pub created_at:        String,
}

impl RawNotification {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id:   row.get(0)?,
      sender_id:         row.get(1)?,
      title:             row.get(2)?,
      message:           row.get(3)?,
      notification_type: row.get(4)?,
      recipient_id:      row.get(5)?,
      target:            row.get(6)?,
      is_read:           row.get(7)?,
      created_at:        row.get(8)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    let audience = Audience::from_parts(
      decode_enum("notification type", &self.notification_type)?,
      decode_opt_uuid(self.recipient_id.as_deref())?,
      decode_opt_enum("notification target", self.target.as_deref())?,
    )?;

    Ok(Notification {
      notification_id: decode_uuid(&self.notification_id)?,
      sender_id: decode_uuid(&self.sender_id)?,
      title: self.title,
      message: self.message,
      audience,
      is_read: self.is_read,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use secours_core::{
    alert::AlertStatus, intervention::InterventionStatus, user::Role,
  };

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let earlier = DateTime::parse_from_rfc3339("2024-03-01T09:59:59.5Z")
      .unwrap()
      .with_timezone(&Utc);
    let later = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
      .unwrap()
      .with_timezone(&Utc);
    assert!(encode_dt(earlier) < encode_dt(later));
    assert_eq!(encode_dt(later), "2024-03-01T10:00:00.000000Z");
    assert_eq!(decode_dt(&encode_dt(earlier)).unwrap(), earlier);
  }

  #[test]
  fn enums_use_wire_names() {
    assert_eq!(encode_enum(InterventionStatus::SurPlace), "SUR_PLACE");
    assert_eq!(encode_enum(AlertStatus::InProgress), "IN_PROGRESS");
    assert_eq!(decode_enum::<Role>("role", "RESCUE").unwrap(), Role::Rescue);
  }

  #[test]
  fn unknown_enum_value_is_reported_with_its_column() {
    let err = decode_enum::<Role>("role", "PILOT").unwrap_err();
    assert!(matches!(
      err,
      Error::UnknownVariant { column: "role", ref value } if value == "PILOT"
    ));
  }

  #[test]
  fn notification_row_with_mismatched_audience_is_rejected() {
    let raw = RawNotification {
      notification_id:   encode_uuid(Uuid::new_v4()),
      sender_id:         encode_uuid(Uuid::new_v4()),
      title:             None,
      message:           "hello".into(),
      notification_type: "MASS".into(),
      recipient_id:      Some(encode_uuid(Uuid::new_v4())),
      target:            None,
      is_read:           false,
      created_at:        encode_dt(Utc::now()),
    };
    assert!(matches!(
      raw.into_notification(),
      Err(Error::Core(secours_core::Error::Validation(_)))
    ));
  }
}
