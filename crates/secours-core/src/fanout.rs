//! Notification fan-out.
//!
//! Two layers:
//!
//! - [`Notifier`] implements the synchronous notification contract: persist
//!   the [`Notification`] row first, then attempt push delivery through a
//!   [`PushGateway`], bounded by a timeout. Delivery failures are logged and
//!   never fail the call once the row exists.
//! - [`Fanout`] decouples lifecycle events from the request path. Dispatch
//!   and transitions publish a [`FanoutEvent`] after their transaction has
//!   committed; a single worker task turns events into notifications.

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::{
  sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
  },
  task::JoinHandle,
};
use uuid::Uuid;

use crate::{
  Error, Result,
  dispatch::Dispatched,
  error::Entity,
  intervention::InterventionStatus,
  lifecycle::Transitioned,
  notification::{Audience, MassTarget, NewNotification, Notification},
  store::EntityStore,
};

/// Title used for push messages when the notification has none.
const DEFAULT_TITLE: &str = "Secours";

// ─── Push gateway ────────────────────────────────────────────────────────────

/// One push batch, addressed by external (provider-side) user identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
  pub target_external_ids: Vec<String>,
  pub title:               String,
  pub body:                String,
  pub data:                Value,
}

/// Provider acknowledgement for an accepted push batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushReceipt {
  pub id: String,
}

/// An external push provider.
///
/// Implementations report provider errors as [`Error::DependencyFailure`].
/// Callers bound every send with a timeout, so implementations need not.
pub trait PushGateway: Send + Sync + 'static {
  fn send(
    &self,
    message: PushMessage,
  ) -> impl Future<Output = Result<PushReceipt>> + Send + '_;
}

/// A gateway for deployments without a push provider. Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGateway;

impl PushGateway for NoopGateway {
  async fn send(&self, message: PushMessage) -> Result<PushReceipt> {
    tracing::debug!(
      recipients = message.target_external_ids.len(),
      title = %message.title,
      "push disabled; dropping message"
    );
    Ok(PushReceipt { id: "noop".into() })
  }
}

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Persists notifications and forwards them to the push gateway.
pub struct Notifier<S, G> {
  store:        Arc<S>,
  gateway:      Arc<G>,
  push_timeout: Duration,
}

impl<S, G> Clone for Notifier<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:        Arc::clone(&self.store),
      gateway:      Arc::clone(&self.gateway),
      push_timeout: self.push_timeout,
    }
  }
}

impl<S, G> Notifier<S, G>
where
  S: EntityStore,
  G: PushGateway,
{
  pub fn new(store: Arc<S>, gateway: Arc<G>, push_timeout: Duration) -> Self {
    Self { store, gateway, push_timeout }
  }

  /// Persist a notification for one user, then push it to that user's
  /// registered devices. Fails with `NotFound` if the recipient does not
  /// exist; push problems are only logged.
  pub async fn notify_unique(
    &self,
    sender_id: Uuid,
    recipient_id: Uuid,
    message: String,
    title: Option<String>,
  ) -> Result<Notification> {
    self
      .notify_unique_with_data(sender_id, recipient_id, message, title, Value::Null)
      .await
  }

  pub(crate) async fn notify_unique_with_data(
    &self,
    sender_id: Uuid,
    recipient_id: Uuid,
    message: String,
    title: Option<String>,
    data: Value,
  ) -> Result<Notification> {
    self
      .store
      .get_user(recipient_id)
      .await
      .map_err(Into::into)?
      .ok_or_else(|| Error::not_found(Entity::User, recipient_id))?;

    let notification = self
      .store
      .add_notification(NewNotification {
        sender_id,
        title,
        message,
        audience: Audience::Unique { recipient_id },
      })
      .await
      .map_err(Into::into)?;

    match self.store.push_identifiers_for_user(recipient_id).await {
      Ok(ids) => self.deliver(&notification, ids, data).await,
      Err(e) => tracing::warn!(
        notification_id = %notification.notification_id,
        %recipient_id,
        error = %e,
        "could not resolve push identifiers"
      ),
    }

    Ok(notification)
  }

  /// Persist one broadcast notification for every user of `target`, then
  /// push a single batch to the identifiers of the users active right now.
  pub async fn notify_mass(
    &self,
    sender_id: Uuid,
    target: MassTarget,
    message: String,
    title: Option<String>,
  ) -> Result<Notification> {
    let notification = self
      .store
      .add_notification(NewNotification {
        sender_id,
        title,
        message,
        audience: Audience::Mass { target },
      })
      .await
      .map_err(Into::into)?;

    match self.store.push_identifiers_for_role(target.role()).await {
      Ok(ids) => self.deliver(&notification, ids, Value::Null).await,
      Err(e) => tracing::warn!(
        notification_id = %notification.notification_id,
        %target,
        error = %e,
        "could not resolve push identifiers"
      ),
    }

    Ok(notification)
  }

  /// Unread notifications addressed to `user_id`, directly or through a
  /// broadcast to the user's role.
  pub async fn unread_for(&self, user_id: Uuid) -> Result<Vec<Notification>> {
    let user = self
      .store
      .get_user(user_id)
      .await
      .map_err(Into::into)?
      .ok_or_else(|| Error::not_found(Entity::User, user_id))?;
    self
      .store
      .unread_notifications(user_id, MassTarget::for_role(user.role))
      .await
      .map_err(Into::into)
  }

  /// Idempotent: marking an already-read notification succeeds.
  pub async fn mark_read(&self, notification_id: Uuid) -> Result<Notification> {
    self.store.mark_read(notification_id).await.map_err(Into::into)
  }

  async fn deliver(
    &self,
    notification: &Notification,
    external_ids: Vec<String>,
    data: Value,
  ) {
    let notification_id = notification.notification_id;
    if external_ids.is_empty() {
      tracing::debug!(%notification_id, "no push identifiers; skipping push");
      return;
    }

    let message = PushMessage {
      target_external_ids: external_ids,
      title: notification
        .title
        .clone()
        .unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
      body: notification.message.clone(),
      data,
    };

    match tokio::time::timeout(self.push_timeout, self.gateway.send(message))
      .await
    {
      Ok(Ok(receipt)) => {
        tracing::debug!(%notification_id, receipt = %receipt.id, "push accepted")
      }
      Ok(Err(e)) => {
        tracing::warn!(%notification_id, error = %e, "push delivery failed")
      }
      Err(_) => tracing::warn!(
        %notification_id,
        timeout_ms = self.push_timeout.as_millis() as u64,
        "push delivery timed out"
      ),
    }
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// A committed state change that someone should hear about.
#[derive(Debug, Clone)]
pub enum FanoutEvent {
  Dispatched(Dispatched),
  Transitioned(Transitioned),
}

/// One directed notification derived from an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
  pub sender_id:    Uuid,
  pub recipient_id: Uuid,
  pub title:        String,
  pub message:      String,
  pub data:         Value,
}

impl FanoutEvent {
  pub fn alert_id(&self) -> Uuid {
    match self {
      Self::Dispatched(d) => d.alert.alert_id,
      Self::Transitioned(t) => t.alert.alert_id,
    }
  }

  /// The notifications this event implies.
  pub fn outgoing(&self) -> Vec<Outgoing> {
    match self {
      Self::Dispatched(d) => {
        let data = json!({
          "kind": "dispatched",
          "alertId": d.alert.alert_id,
          "interventionId": d.intervention.intervention_id,
        });
        let place = d
          .alert
          .address
          .clone()
          .unwrap_or_else(|| format!("{:.5}, {:.5}", d.alert.location.lat, d.alert.location.lng));
        vec![
          Outgoing {
            sender_id:    d.intervention.dispatched_by,
            recipient_id: d.member.user_id,
            title:        "New intervention".into(),
            message:      format!(
              "New intervention assigned: {} at {place}.",
              d.alert.category
            ),
            data:         data.clone(),
          },
          Outgoing {
            sender_id: d.intervention.dispatched_by,
            recipient_id: d.alert.reporter_id,
            title: "Help is coming".into(),
            message: "Your alert was accepted; a response is en route.".into(),
            data,
          },
        ]
      }
      Self::Transitioned(t) => {
        let (kind, title, message) = match t.intervention.status {
          InterventionStatus::SurPlace => (
            "sur_place",
            "Team on site",
            "The rescue team is on site.",
          ),
          InterventionStatus::Terminee => (
            "terminee",
            "Intervention completed",
            "The intervention is completed.",
          ),
          InterventionStatus::Annulee => (
            "annulee",
            "Intervention cancelled",
            "The intervention was cancelled; your alert remains open.",
          ),
          InterventionStatus::EnRoute => return Vec::new(),
        };
        vec![Outgoing {
          sender_id:    t.acted_by,
          recipient_id: t.alert.reporter_id,
          title:        title.into(),
          message:      message.into(),
          data:         json!({
            "kind": kind,
            "alertId": t.alert.alert_id,
            "interventionId": t.intervention.intervention_id,
          }),
        }]
      }
    }
  }
}

// ─── Worker ──────────────────────────────────────────────────────────────────

enum Job {
  Event(FanoutEvent),
  Flush(oneshot::Sender<()>),
}

/// Handle for publishing events to the fan-out worker. Cheap to clone.
#[derive(Clone)]
pub struct Fanout {
  tx: mpsc::Sender<Job>,
}

/// The running fan-out worker. It exits once every [`Fanout`] handle has been
/// dropped and the queue is drained.
pub struct FanoutWorker {
  handle: JoinHandle<()>,
}

impl Fanout {
  /// Spawn the worker on the current tokio runtime. At most `capacity`
  /// events wait in its queue.
  pub fn spawn<S, G>(notifier: Notifier<S, G>, capacity: usize) -> (Self, FanoutWorker)
  where
    S: EntityStore,
    G: PushGateway,
  {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(run(notifier, rx));
    (Self { tx }, FanoutWorker { handle })
  }

  /// Queue an event. Never blocks and never fails the caller: when the queue
  /// is full or the worker has stopped the event is logged and dropped.
  /// Returns whether the event was queued.
  pub fn publish(&self, event: FanoutEvent) -> bool {
    match self.tx.try_send(Job::Event(event)) {
      Ok(()) => true,
      Err(TrySendError::Full(job)) => {
        if let Job::Event(event) = job {
          tracing::warn!(alert_id = %event.alert_id(), "fan-out queue full; event dropped");
        }
        false
      }
      Err(_) => {
        tracing::warn!("fan-out worker has stopped; event dropped");
        false
      }
    }
  }

  /// Wait until every event published before this call has been processed.
  pub async fn flush(&self) {
    let (ack, done) = oneshot::channel();
    if self.tx.send(Job::Flush(ack)).await.is_ok() {
      let _ = done.await;
    }
  }
}

impl FanoutWorker {
  /// Wait for the worker to drain its queue and exit.
  pub async fn join(self) {
    if let Err(e) = self.handle.await {
      tracing::error!(error = %e, "fan-out worker panicked");
    }
  }
}

async fn run<S, G>(notifier: Notifier<S, G>, mut rx: mpsc::Receiver<Job>)
where
  S: EntityStore,
  G: PushGateway,
{
  while let Some(job) = rx.recv().await {
    match job {
      Job::Event(event) => {
        for out in event.outgoing() {
          let recipient_id = out.recipient_id;
          if let Err(e) = notifier
            .notify_unique_with_data(
              out.sender_id,
              out.recipient_id,
              out.message,
              Some(out.title),
              out.data,
            )
            .await
          {
            tracing::warn!(%recipient_id, error = %e, "fan-out notification failed");
          }
        }
      }
      Job::Flush(ack) => {
        let _ = ack.send(());
      }
    }
  }
  tracing::debug!("fan-out worker stopped");
}
