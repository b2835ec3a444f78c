//! [`SqliteStore`]: the SQLite implementation of [`EntityStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{
  Connection, ErrorCode, OptionalExtension as _, Transaction, TransactionBehavior,
};
use uuid::Uuid;

use secours_core::{
  alert::{Alert, AlertStatus, NewAlert},
  dispatch::{DispatchContext, Dispatched, check_preconditions},
  error::{ConflictReason, Entity},
  intervention::{
    Intervention, InterventionStatus, NewIntervention, TransitionRequest,
    plan_transition,
  },
  lifecycle::Transitioned,
  notification::{MassTarget, NewNotification, Notification},
  rescue::{MemberStanding, NewRescueMember, RescueMember, RescueService},
  store::EntityStore,
  user::{NewUser, Role, User},
};

use crate::{
  Error, Result,
  encode::{
    ALERT_COLUMNS, INTERVENTION_COLUMNS, MEMBER_COLUMNS, NOTIFICATION_COLUMNS,
    RawAlert, RawIntervention, RawMember, RawNotification, RawService, RawUser,
    SERVICE_COLUMNS, USER_COLUMNS, encode_dt, encode_enum, encode_uuid,
  },
  schema::SCHEMA,
};

type CoreError = secours_core::Error;

/// The current time at the precision the store keeps, so values handed back
/// to callers equal what a later read returns.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Secours entity store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted, and every
/// clone funnels into the same database thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the database thread.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` on the database thread inside a `BEGIN IMMEDIATE` transaction.
  /// The write lock is taken up front, so everything `f` reads is still true
  /// when it commits. Any error rolls the transaction back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::from)
            .and_then(|tx| {
              let out = f(&tx)?;
              tx.commit()?;
              Ok(out)
            }),
        )
      })
      .await?
  }
}

// ─── Row access ──────────────────────────────────────────────────────────────

fn load_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

fn load_service(conn: &Connection, id: Uuid) -> Result<Option<RescueService>> {
  conn
    .query_row(
      &format!("SELECT {SERVICE_COLUMNS} FROM rescue_services WHERE service_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawService::from_row,
    )
    .optional()?
    .map(RawService::into_service)
    .transpose()
}

fn load_member(conn: &Connection, id: Uuid) -> Result<Option<RescueMember>> {
  conn
    .query_row(
      &format!(
        "SELECT {MEMBER_COLUMNS} FROM rescue_members WHERE rescue_member_id = ?1"
      ),
      rusqlite::params![encode_uuid(id)],
      RawMember::from_row,
    )
    .optional()?
    .map(RawMember::into_member)
    .transpose()
}

fn load_alert(conn: &Connection, id: Uuid) -> Result<Option<Alert>> {
  conn
    .query_row(
      &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE alert_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawAlert::from_row,
    )
    .optional()?
    .map(RawAlert::into_alert)
    .transpose()
}

fn load_intervention(conn: &Connection, id: Uuid) -> Result<Option<Intervention>> {
  conn
    .query_row(
      &format!(
        "SELECT {INTERVENTION_COLUMNS} FROM interventions WHERE intervention_id = ?1"
      ),
      rusqlite::params![encode_uuid(id)],
      RawIntervention::from_row,
    )
    .optional()?
    .map(RawIntervention::into_intervention)
    .transpose()
}

fn load_notification(conn: &Connection, id: Uuid) -> Result<Option<Notification>> {
  conn
    .query_row(
      &format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = ?1"
      ),
      rusqlite::params![encode_uuid(id)],
      RawNotification::from_row,
    )
    .optional()?
    .map(RawNotification::into_notification)
    .transpose()
}

fn require<T>(found: Option<T>, entity: Entity, id: Uuid) -> Result<T> {
  found.ok_or_else(|| CoreError::not_found(entity, id).into())
}

/// Whether a non-terminal intervention references `id` through `column`.
fn has_active_intervention(
  conn: &Connection,
  column: &'static str,
  id: Uuid,
) -> Result<bool> {
  Ok(conn.query_row(
    &format!(
      "SELECT EXISTS (
         SELECT 1 FROM interventions
         WHERE {column} = ?1 AND status IN ('EN_ROUTE', 'SUR_PLACE')
       )"
    ),
    rusqlite::params![encode_uuid(id)],
    |row| row.get(0),
  )?)
}

/// Turn uniqueness violations the domain cares about into conflicts.
fn constraint_conflict(err: rusqlite::Error) -> Error {
  if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
    if failure.code == ErrorCode::ConstraintViolation {
      let reason = if message.contains("interventions.alert_id") {
        Some(ConflictReason::AlertAlreadyDispatched)
      } else if message.contains("interventions.rescue_member_id") {
        Some(ConflictReason::RescuerBusy)
      } else if message.contains("rescue_members.badge_number") {
        Some(ConflictReason::DuplicateBadge)
      } else if message.contains("rescue_members.user_id") {
        Some(ConflictReason::RescuerAlreadyRegistered)
      } else {
        None
      };
      if let Some(reason) = reason {
        return CoreError::Conflict(reason).into();
      }
    }
  }
  Error::Sqlite(err)
}

// ─── Transactions ────────────────────────────────────────────────────────────

fn dispatch_tx(
  tx: &Transaction<'_>,
  input: NewIntervention,
  now: DateTime<Utc>,
) -> Result<Dispatched> {
  let alert = require(load_alert(tx, input.alert_id)?, Entity::Alert, input.alert_id)?;
  let member = require(
    load_member(tx, input.rescue_member_id)?,
    Entity::RescueMember,
    input.rescue_member_id,
  )?;
  let member_user = require(load_user(tx, member.user_id)?, Entity::User, member.user_id)?;
  let service = require(
    load_service(tx, member.service_id)?,
    Entity::RescueService,
    member.service_id,
  )?;

  let ctx = DispatchContext {
    alert_has_active_intervention: has_active_intervention(
      tx,
      "alert_id",
      alert.alert_id,
    )?,
    member_has_active_intervention: has_active_intervention(
      tx,
      "rescue_member_id",
      member.rescue_member_id,
    )?,
    member_user_active: member_user.is_active,
    member_service_active: service.is_active,
    alert,
    member,
  };
  check_preconditions(&ctx)?;

  let intervention = Intervention {
    intervention_id:  Uuid::new_v4(),
    alert_id:         input.alert_id,
    rescue_member_id: input.rescue_member_id,
    dispatched_by:    input.dispatched_by,
    status:           InterventionStatus::INITIAL,
    start_time:       now,
    arrival_time:     None,
    end_time:         None,
    notes:            None,
  };

  tx.execute(
    "INSERT INTO interventions (
       intervention_id, alert_id, rescue_member_id, dispatched_by,
       status, start_time
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      encode_uuid(intervention.intervention_id),
      encode_uuid(intervention.alert_id),
      encode_uuid(intervention.rescue_member_id),
      encode_uuid(intervention.dispatched_by),
      encode_enum(intervention.status),
      encode_dt(now),
    ],
  )
  .map_err(constraint_conflict)?;

  let DispatchContext { mut alert, member, .. } = ctx;
  alert.status = AlertStatus::Accepted;
  alert.updated_at = now;
  set_alert_status(tx, &alert)?;

  Ok(Dispatched { intervention, alert, member })
}

fn apply_transition_tx(
  tx: &Transaction<'_>,
  request: TransitionRequest,
  now: DateTime<Utc>,
) -> Result<Transitioned> {
  let current = require(
    load_intervention(tx, request.intervention_id)?,
    Entity::Intervention,
    request.intervention_id,
  )?;
  let member = require(
    load_member(tx, current.rescue_member_id)?,
    Entity::RescueMember,
    current.rescue_member_id,
  )?;

  let plan = plan_transition(&current, member.user_id, &request, now)?;
  let next = &plan.intervention;

  tx.execute(
    "UPDATE interventions
     SET status = ?2, arrival_time = ?3, end_time = ?4, notes = ?5
     WHERE intervention_id = ?1",
    rusqlite::params![
      encode_uuid(next.intervention_id),
      encode_enum(next.status),
      next.arrival_time.map(encode_dt),
      next.end_time.map(encode_dt),
      next.notes,
    ],
  )
  .map_err(constraint_conflict)?;

  let mut alert = require(load_alert(tx, current.alert_id)?, Entity::Alert, current.alert_id)?;
  if let Some(status) = plan.alert_status {
    alert.status = status;
    alert.updated_at = now;
    set_alert_status(tx, &alert)?;
  }

  Ok(Transitioned {
    intervention: plan.intervention,
    previous: plan.previous,
    alert,
    acted_by: request.actor.id,
  })
}

fn cancel_alert_tx(tx: &Transaction<'_>, id: Uuid, now: DateTime<Utc>) -> Result<Alert> {
  let mut alert = require(load_alert(tx, id)?, Entity::Alert, id)?;
  if alert.status.is_closed() {
    return Err(CoreError::Conflict(ConflictReason::AlertClosed).into());
  }
  if has_active_intervention(tx, "alert_id", id)? {
    return Err(CoreError::Conflict(ConflictReason::AlertHasActiveIntervention).into());
  }
  alert.status = AlertStatus::Cancelled;
  alert.updated_at = now;
  set_alert_status(tx, &alert)?;
  Ok(alert)
}

fn add_rescue_member_tx(
  tx: &Transaction<'_>,
  input: NewRescueMember,
  now: DateTime<Utc>,
) -> Result<RescueMember> {
  let user = require(load_user(tx, input.user_id)?, Entity::User, input.user_id)?;
  input.check_account(&user)?;
  require(load_service(tx, input.service_id)?, Entity::RescueService, input.service_id)?;

  let member = RescueMember {
    rescue_member_id: Uuid::new_v4(),
    user_id:          input.user_id,
    service_id:       input.service_id,
    position:         input.position,
    badge_number:     input.badge_number,
    is_on_duty:       false,
    created_at:       now,
  };

  tx.execute(
    "INSERT INTO rescue_members (
       rescue_member_id, user_id, service_id, position,
       badge_number, is_on_duty, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_uuid(member.rescue_member_id),
      encode_uuid(member.user_id),
      encode_uuid(member.service_id),
      member.position,
      member.badge_number,
      member.is_on_duty,
      encode_dt(now),
    ],
  )
  .map_err(constraint_conflict)?;

  Ok(member)
}

fn set_alert_status(conn: &Connection, alert: &Alert) -> Result<()> {
  conn.execute(
    "UPDATE alerts SET status = ?2, updated_at = ?3 WHERE alert_id = ?1",
    rusqlite::params![
      encode_uuid(alert.alert_id),
      encode_enum(alert.status),
      encode_dt(alert.updated_at),
    ],
  )?;
  Ok(())
}

/// Run a single-row `UPDATE` and fail with `NotFound` when nothing matched.
fn update_one(
  conn: &Connection,
  sql: &str,
  params: impl rusqlite::Params,
  entity: Entity,
  id: Uuid,
) -> Result<()> {
  match conn.execute(sql, params)? {
    0 => Err(CoreError::not_found(entity, id).into()),
    _ => Ok(()),
  }
}

// ─── EntityStore impl ────────────────────────────────────────────────────────

impl EntityStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:      Uuid::new_v4(),
      display_name: input.display_name,
      role:         input.role,
      is_active:    true,
      created_at:   now(),
    };

    let id_str = encode_uuid(user.user_id);
    let name = user.display_name.clone();
    let role_str = encode_enum(user.role);
    let at_str = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, display_name, role, is_active, created_at)
           VALUES (?1, ?2, ?3, 1, ?4)",
          rusqlite::params![id_str, name, role_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.read(move |conn| load_user(conn, id)).await
  }

  async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User> {
    self
      .write(move |tx| {
        update_one(
          tx,
          "UPDATE users SET is_active = ?2 WHERE user_id = ?1",
          rusqlite::params![encode_uuid(id), active],
          Entity::User,
          id,
        )?;
        require(load_user(tx, id)?, Entity::User, id)
      })
      .await
  }

  async fn add_push_identifier(&self, user_id: Uuid, external_id: String) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO push_identifiers (user_id, external_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, external_id, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn push_identifiers_for_user(&self, user_id: Uuid) -> Result<Vec<String>> {
    let id_str = encode_uuid(user_id);

    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT external_id FROM push_identifiers
           WHERE user_id = ?1
           ORDER BY created_at, external_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  async fn push_identifiers_for_role(&self, role: Role) -> Result<Vec<String>> {
    let role_str = encode_enum(role);

    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT p.external_id
           FROM push_identifiers p
           JOIN users u ON u.user_id = p.user_id
           WHERE u.role = ?1 AND u.is_active = 1
           ORDER BY p.external_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![role_str], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  // ── Rescue services and members ───────────────────────────────────────────

  async fn add_rescue_service(&self, name: String) -> Result<RescueService> {
    let service = RescueService {
      service_id: Uuid::new_v4(),
      name,
      is_active:  true,
      created_at: now(),
    };

    let id_str = encode_uuid(service.service_id);
    let name = service.name.clone();
    let at_str = encode_dt(service.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rescue_services (service_id, name, is_active, created_at)
           VALUES (?1, ?2, 1, ?3)",
          rusqlite::params![id_str, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(service)
  }

  async fn get_rescue_service(&self, id: Uuid) -> Result<Option<RescueService>> {
    self.read(move |conn| load_service(conn, id)).await
  }

  async fn set_rescue_service_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> Result<RescueService> {
    self
      .write(move |tx| {
        update_one(
          tx,
          "UPDATE rescue_services SET is_active = ?2 WHERE service_id = ?1",
          rusqlite::params![encode_uuid(id), active],
          Entity::RescueService,
          id,
        )?;
        require(load_service(tx, id)?, Entity::RescueService, id)
      })
      .await
  }

  async fn add_rescue_member(&self, input: NewRescueMember) -> Result<RescueMember> {
    let now = now();
    self.write(move |tx| add_rescue_member_tx(tx, input, now)).await
  }

  async fn get_rescue_member(&self, id: Uuid) -> Result<Option<RescueMember>> {
    self.read(move |conn| load_member(conn, id)).await
  }

  async fn set_on_duty(&self, id: Uuid, on_duty: bool) -> Result<RescueMember> {
    self
      .write(move |tx| {
        update_one(
          tx,
          "UPDATE rescue_members SET is_on_duty = ?2 WHERE rescue_member_id = ?1",
          rusqlite::params![encode_uuid(id), on_duty],
          Entity::RescueMember,
          id,
        )?;
        require(load_member(tx, id)?, Entity::RescueMember, id)
      })
      .await
  }

  async fn member_standings(&self) -> Result<Vec<MemberStanding>> {
    let raws: Vec<(RawMember, bool, bool, bool)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT
             m.rescue_member_id, m.user_id, m.service_id, m.position,
             m.badge_number, m.is_on_duty, m.created_at,
             u.is_active,
             s.is_active,
             EXISTS (
               SELECT 1 FROM interventions i
               WHERE i.rescue_member_id = m.rescue_member_id
                 AND i.status IN ('EN_ROUTE', 'SUR_PLACE')
             )
           FROM rescue_members m
           JOIN users           u ON u.user_id    = m.user_id
           JOIN rescue_services s ON s.service_id = m.service_id
           ORDER BY m.rescue_member_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok((RawMember::from_row(row)?, row.get(7)?, row.get(8)?, row.get(9)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, user_active, service_active, busy)| -> Result<MemberStanding> {
        Ok(MemberStanding {
          member: raw.into_member()?,
          user_active,
          service_active,
          busy,
        })
      })
      .collect()
  }

  // ── Alerts ────────────────────────────────────────────────────────────────

  async fn add_alert(&self, input: NewAlert) -> Result<Alert> {
    let now = now();
    let alert = Alert {
      alert_id:    Uuid::new_v4(),
      reporter_id: input.reporter_id,
      location:    input.location,
      category:    input.category,
      description: input.description,
      address:     input.address,
      status:      AlertStatus::Pending,
      created_at:  now,
      updated_at:  now,
    };

    let row = alert.clone();
    self
      .write(move |tx| {
        require(load_user(tx, row.reporter_id)?, Entity::User, row.reporter_id)?;
        tx.execute(
          "INSERT INTO alerts (
             alert_id, reporter_id, latitude, longitude, category,
             description, address, status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            encode_uuid(row.alert_id),
            encode_uuid(row.reporter_id),
            row.location.lat,
            row.location.lng,
            encode_enum(row.category),
            row.description,
            row.address,
            encode_enum(row.status),
            encode_dt(row.created_at),
            encode_dt(row.updated_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(alert)
  }

  async fn get_alert(&self, id: Uuid) -> Result<Option<Alert>> {
    self.read(move |conn| load_alert(conn, id)).await
  }

  async fn cancel_alert(&self, id: Uuid) -> Result<Alert> {
    let now = now();
    self.write(move |tx| cancel_alert_tx(tx, id, now)).await
  }

  // ── Interventions ─────────────────────────────────────────────────────────

  async fn dispatch(&self, input: NewIntervention) -> Result<Dispatched> {
    let now = now();
    let dispatched = self.write(move |tx| dispatch_tx(tx, input, now)).await?;
    tracing::debug!(
      intervention_id = %dispatched.intervention.intervention_id,
      alert_id = %input.alert_id,
      rescue_member_id = %input.rescue_member_id,
      "intervention committed"
    );
    Ok(dispatched)
  }

  async fn get_intervention(&self, id: Uuid) -> Result<Option<Intervention>> {
    self.read(move |conn| load_intervention(conn, id)).await
  }

  async fn interventions_for_alert(&self, alert_id: Uuid) -> Result<Vec<Intervention>> {
    let id_str = encode_uuid(alert_id);

    let raws: Vec<RawIntervention> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {INTERVENTION_COLUMNS} FROM interventions
           WHERE alert_id = ?1
           ORDER BY start_time, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawIntervention::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIntervention::into_intervention).collect()
  }

  async fn apply_transition(&self, request: TransitionRequest) -> Result<Transitioned> {
    let now = now();
    self.write(move |tx| apply_transition_tx(tx, request, now)).await
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn add_notification(&self, input: NewNotification) -> Result<Notification> {
    let notification = Notification {
      notification_id: Uuid::new_v4(),
      sender_id:       input.sender_id,
      title:           input.title,
      message:         input.message,
      audience:        input.audience,
      is_read:         false,
      created_at:      now(),
    };

    let id_str = encode_uuid(notification.notification_id);
    let sender_str = encode_uuid(notification.sender_id);
    let title = notification.title.clone();
    let message = notification.message.clone();
    let type_str = encode_enum(notification.audience.kind());
    let recipient_str = notification.audience.recipient_id().map(encode_uuid);
    let target_str = notification.audience.target().map(encode_enum::<MassTarget>);
    let at_str = encode_dt(notification.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO notifications (
             notification_id, sender_id, title, message,
             notification_type, recipient_id, target, is_read, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
          rusqlite::params![
            id_str,
            sender_str,
            title,
            message,
            type_str,
            recipient_str,
            target_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(notification)
  }

  async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>> {
    self.read(move |conn| load_notification(conn, id)).await
  }

  async fn unread_notifications(
    &self,
    user_id: Uuid,
    target: Option<MassTarget>,
  ) -> Result<Vec<Notification>> {
    let id_str = encode_uuid(user_id);
    let target_str = target.map(encode_enum::<MassTarget>);

    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE is_read = 0
             AND (recipient_id = ?1 OR (?2 IS NOT NULL AND target = ?2))
           ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, target_str], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn mark_read(&self, id: Uuid) -> Result<Notification> {
    self
      .write(move |tx| {
        update_one(
          tx,
          "UPDATE notifications SET is_read = 1 WHERE notification_id = ?1",
          rusqlite::params![encode_uuid(id)],
          Entity::Notification,
          id,
        )?;
        require(load_notification(tx, id)?, Entity::Notification, id)
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// A bare connection with the schema applied and foreign keys off, so
  /// intervention rows can be written without their parents.
  fn bare_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
    conn
  }

  fn insert_intervention(
    conn: &Connection,
    alert_id: Uuid,
    member_id: Uuid,
    status: InterventionStatus,
  ) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO interventions
         (intervention_id, alert_id, rescue_member_id, dispatched_by, status, start_time)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      rusqlite::params![
        encode_uuid(Uuid::new_v4()),
        encode_uuid(alert_id),
        encode_uuid(member_id),
        encode_uuid(Uuid::new_v4()),
        encode_enum(status),
        encode_dt(now()),
      ],
    )
  }

  fn conflict_of(err: rusqlite::Error) -> ConflictReason {
    match constraint_conflict(err) {
      Error::Core(CoreError::Conflict(reason)) => reason,
      other => panic!("expected a conflict, got {other:?}"),
    }
  }

  #[test]
  fn second_active_intervention_on_an_alert_is_a_conflict() {
    let conn = bare_connection();
    let (alert, first, second) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    insert_intervention(&conn, alert, first, InterventionStatus::EnRoute).unwrap();

    let err =
      insert_intervention(&conn, alert, second, InterventionStatus::SurPlace).unwrap_err();
    assert_eq!(conflict_of(err), ConflictReason::AlertAlreadyDispatched);
  }

  #[test]
  fn second_active_intervention_for_a_rescuer_is_a_conflict() {
    let conn = bare_connection();
    let member = Uuid::new_v4();
    insert_intervention(&conn, Uuid::new_v4(), member, InterventionStatus::SurPlace).unwrap();

    let err = insert_intervention(&conn, Uuid::new_v4(), member, InterventionStatus::EnRoute)
      .unwrap_err();
    assert_eq!(conflict_of(err), ConflictReason::RescuerBusy);
  }

  #[test]
  fn terminal_interventions_do_not_block_new_ones() {
    let conn = bare_connection();
    let (alert, member) = (Uuid::new_v4(), Uuid::new_v4());
    insert_intervention(&conn, alert, member, InterventionStatus::Annulee).unwrap();
    insert_intervention(&conn, alert, member, InterventionStatus::Terminee).unwrap();
    insert_intervention(&conn, alert, member, InterventionStatus::EnRoute).unwrap();
  }

  #[test]
  fn unrelated_constraint_failures_stay_storage_errors() {
    let conn = bare_connection();
    let err = conn
      .execute(
        "INSERT INTO users (user_id, display_name, role, created_at)
         VALUES ('u', 'Nobody', 'ROOT', '2024-01-01T00:00:00Z')",
        [],
      )
      .unwrap_err();
    assert!(matches!(constraint_conflict(err), Error::Sqlite(_)));
  }
}
