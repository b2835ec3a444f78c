//! Async HTTP client wrapping the Secours JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, Response};
use secours_core::{
  alert::{Alert, AlertCategory, Location},
  intervention::{Intervention, InterventionStatus},
  notification::{MassTarget, Notification},
  rescue::{RescueMember, RescueService},
  user::{Role, User},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use uuid::Uuid;

/// Connection settings for the Secours API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
  /// The user every request acts as.
  pub actor:    Uuid,
}

/// Async HTTP client for the Secours JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    let req = req.header("X-Actor-Id", self.config.actor.to_string());
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Send `req` and decode a successful reply; failures carry the server's
  /// error text.
  async fn call<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    let resp = self
      .auth(req)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    let resp = check(resp, what).await?;
    resp
      .json()
      .await
      .with_context(|| format!("deserialising {what} reply"))
  }

  // ── Dispatch and lifecycle ────────────────────────────────────────────

  /// `POST /api/dispatch`
  pub async fn dispatch(&self, alert_id: Uuid, rescue_member_id: Uuid) -> Result<Intervention> {
    let body = json!({ "alertId": alert_id, "rescueMemberId": rescue_member_id });
    self
      .call(self.client.post(self.url("/dispatch")).json(&body), "POST /dispatch")
      .await
  }

  /// `PATCH /api/intervention/{id}/status`
  pub async fn transition(
    &self,
    id: Uuid,
    status: InterventionStatus,
    notes: Option<String>,
  ) -> Result<Intervention> {
    let body = json!({ "status": status, "notes": notes });
    self
      .call(
        self
          .client
          .patch(self.url(&format!("/intervention/{id}/status")))
          .json(&body),
        "PATCH /intervention/{id}/status",
      )
      .await
  }

  /// `GET /api/interventions/{id}`
  pub async fn intervention(&self, id: Uuid) -> Result<Intervention> {
    self
      .call(
        self.client.get(self.url(&format!("/interventions/{id}"))),
        "GET /interventions/{id}",
      )
      .await
  }

  /// `GET /api/eligibility/{alert_id}`
  pub async fn candidates(&self, alert_id: Uuid) -> Result<Vec<RescueMember>> {
    self
      .call(
        self.client.get(self.url(&format!("/eligibility/{alert_id}"))),
        "GET /eligibility/{alert_id}",
      )
      .await
  }

  // ── Alerts ────────────────────────────────────────────────────────────

  /// `POST /api/alerts`
  pub async fn submit_alert(
    &self,
    location: Location,
    category: AlertCategory,
    description: String,
    address: Option<String>,
  ) -> Result<Alert> {
    let body = json!({
      "location": location,
      "category": category,
      "description": description,
      "address": address,
    });
    self
      .call(self.client.post(self.url("/alerts")).json(&body), "POST /alerts")
      .await
  }

  /// `GET /api/alerts/{id}`
  pub async fn alert(&self, id: Uuid) -> Result<Alert> {
    self
      .call(self.client.get(self.url(&format!("/alerts/{id}"))), "GET /alerts/{id}")
      .await
  }

  /// `POST /api/alerts/{id}/cancel`
  pub async fn cancel_alert(&self, id: Uuid) -> Result<Alert> {
    self
      .call(
        self.client.post(self.url(&format!("/alerts/{id}/cancel"))),
        "POST /alerts/{id}/cancel",
      )
      .await
  }

  /// `GET /api/alerts/{id}/interventions`
  pub async fn alert_history(&self, id: Uuid) -> Result<Vec<Intervention>> {
    self
      .call(
        self.client.get(self.url(&format!("/alerts/{id}/interventions"))),
        "GET /alerts/{id}/interventions",
      )
      .await
  }

  // ── Notifications ─────────────────────────────────────────────────────

  /// `POST /api/notifications` addressed to one user.
  pub async fn notify_user(
    &self,
    recipient_id: Uuid,
    message: String,
    title: Option<String>,
  ) -> Result<Notification> {
    let body = json!({
      "type": "UNIQUE",
      "recipientId": recipient_id,
      "message": message,
      "title": title,
    });
    self.send_notification(body).await
  }

  /// `POST /api/notifications` broadcast to a role.
  pub async fn broadcast(
    &self,
    target: MassTarget,
    message: String,
    title: Option<String>,
  ) -> Result<Notification> {
    let body = json!({
      "type": "MASS",
      "target": target,
      "message": message,
      "title": title,
    });
    self.send_notification(body).await
  }

  async fn send_notification(&self, body: Value) -> Result<Notification> {
    self
      .call(
        self.client.post(self.url("/notifications")).json(&body),
        "POST /notifications",
      )
      .await
  }

  /// `GET /api/notifications/unread`
  pub async fn unread(&self) -> Result<Vec<Notification>> {
    self
      .call(
        self.client.get(self.url("/notifications/unread")),
        "GET /notifications/unread",
      )
      .await
  }

  /// `PATCH /api/notifications/{id}/read`
  pub async fn mark_read(&self, id: Uuid) -> Result<Notification> {
    self
      .call(
        self.client.patch(self.url(&format!("/notifications/{id}/read"))),
        "PATCH /notifications/{id}/read",
      )
      .await
  }

  // ── Directory ─────────────────────────────────────────────────────────

  /// `POST /api/users`
  pub async fn create_user(&self, display_name: String, role: Role) -> Result<User> {
    let body = json!({ "displayName": display_name, "role": role });
    self
      .call(self.client.post(self.url("/users")).json(&body), "POST /users")
      .await
  }

  /// `PATCH /api/users/{id}/active`
  pub async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User> {
    self
      .call(
        self
          .client
          .patch(self.url(&format!("/users/{id}/active")))
          .json(&json!({ "active": active })),
        "PATCH /users/{id}/active",
      )
      .await
  }

  /// `POST /api/users/{id}/push-ids`
  pub async fn register_push_id(&self, id: Uuid, external_id: String) -> Result<()> {
    let what = "POST /users/{id}/push-ids";
    let resp = self
      .auth(
        self
          .client
          .post(self.url(&format!("/users/{id}/push-ids")))
          .json(&json!({ "externalId": external_id })),
      )
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    check(resp, what).await?;
    Ok(())
  }

  /// `POST /api/rescue-services`
  pub async fn create_service(&self, name: String) -> Result<RescueService> {
    self
      .call(
        self
          .client
          .post(self.url("/rescue-services"))
          .json(&json!({ "name": name })),
        "POST /rescue-services",
      )
      .await
  }

  /// `PATCH /api/rescue-services/{id}/active`
  pub async fn set_service_active(&self, id: Uuid, active: bool) -> Result<RescueService> {
    self
      .call(
        self
          .client
          .patch(self.url(&format!("/rescue-services/{id}/active")))
          .json(&json!({ "active": active })),
        "PATCH /rescue-services/{id}/active",
      )
      .await
  }

  /// `POST /api/rescue-members`
  pub async fn create_member(
    &self,
    user_id: Uuid,
    service_id: Uuid,
    position: String,
    badge_number: String,
  ) -> Result<RescueMember> {
    let body = json!({
      "userId": user_id,
      "serviceId": service_id,
      "position": position,
      "badgeNumber": badge_number,
    });
    self
      .call(
        self.client.post(self.url("/rescue-members")).json(&body),
        "POST /rescue-members",
      )
      .await
  }

  /// `PATCH /api/rescue-members/{id}/duty`
  pub async fn set_duty(&self, id: Uuid, on_duty: bool) -> Result<RescueMember> {
    self
      .call(
        self
          .client
          .patch(self.url(&format!("/rescue-members/{id}/duty")))
          .json(&json!({ "onDuty": on_duty })),
        "PATCH /rescue-members/{id}/duty",
      )
      .await
  }
}

/// Turn a non-success reply into an error carrying the server's explanation.
async fn check(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body: Value = resp.json().await.unwrap_or(Value::Null);
  Err(anyhow!("{what} → {status}: {}", describe_error(&body)))
}

/// Render an API error body: the message plus any structured detail.
fn describe_error(body: &Value) -> String {
  let message = body["error"].as_str().unwrap_or("no details");
  if let Some(next) = body["validNextStates"].as_array() {
    let next: Vec<&str> = next.iter().filter_map(Value::as_str).collect();
    return format!("{message} (valid next states: {})", next.join(", "));
  }
  message.to_string()
}
