//! Alerts — citizen-submitted emergency reports.
//!
//! An alert is never deleted. Its status is only ever written by the dispatch
//! coordinator, the intervention state machine, or an administrative
//! cancellation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

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
pub enum AlertStatus {
  Pending,
  Accepted,
  InProgress,
  Resolved,
  Cancelled,
}

impl AlertStatus {
  /// Closed alerts can no longer be dispatched or cancelled.
  pub fn is_closed(self) -> bool {
    matches!(self, Self::Resolved | Self::Cancelled)
  }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// The closed set of incident categories a citizen can report.
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
pub enum AlertCategory {
  Fire,
  Medical,
  Accident,
  Flood,
  Violence,
  NaturalDisaster,
  Other,
}

// ─── Location ────────────────────────────────────────────────────────────────

/// WGS84 coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub lat: f64,
  pub lng: f64,
}

impl Location {
  pub fn new(lat: f64, lng: f64) -> Result<Self> {
    let loc = Self { lat, lng };
    loc.validate()?;
    Ok(loc)
  }

  pub fn validate(&self) -> Result<()> {
    // Range checks are written so that NaN fails them too.
    if !(-90.0..=90.0).contains(&self.lat) {
      return Err(Error::validation(format!(
        "latitude {} is outside [-90, 90]",
        self.lat
      )));
    }
    if !(-180.0..=180.0).contains(&self.lng) {
      return Err(Error::validation(format!(
        "longitude {} is outside [-180, 180]",
        self.lng
      )));
    }
    Ok(())
  }
}

// ─── Alert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
  pub alert_id:    Uuid,
  pub reporter_id: Uuid,
  pub location:    Location,
  pub category:    AlertCategory,
  pub description: String,
  /// Human-readable address, filled in by a geocoding collaborator if one is
  /// available. Not needed for dispatch.
  pub address:     Option<String>,
  pub status:      AlertStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::EntityStore::add_alert`]. Alerts always start
/// PENDING.
#[derive(Debug, Clone)]
pub struct NewAlert {
  pub reporter_id: Uuid,
  pub location:    Location,
  pub category:    AlertCategory,
  pub description: String,
  pub address:     Option<String>,
}

impl NewAlert {
  pub fn validate(&self) -> Result<()> {
    self.location.validate()?;
    if self.description.trim().is_empty() {
      return Err(Error::validation("description must not be empty"));
    }
    Ok(())
  }
}
