//! Handlers for alert endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/alerts` | Citizen report; returns 201 with the PENDING alert |
//! | `GET`  | `/alerts/{id}` | Reporter, rescuers and administrators |
//! | `POST` | `/alerts/{id}/cancel` | Administrators; 409 while an intervention is active |
//! | `GET`  | `/alerts/{id}/interventions` | Dispatch history, oldest first |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use secours_core::{
  alert::{Alert, AlertCategory, Location},
  directory::AlertReport,
  fanout::PushGateway,
  intervention::Intervention,
  store::EntityStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Actor,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

// ─── Submit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
  pub location:    Location,
  pub category:    AlertCategory,
  pub description: String,
  #[serde(default)]
  pub address:     Option<String>,
}

impl From<ReportBody> for AlertReport {
  fn from(body: ReportBody) -> Self {
    Self {
      location:    body.location,
      category:    body.category,
      description: body.description,
      address:     body.address,
    }
  }
}

/// `POST /alerts`
pub async fn submit<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiJson(body): ApiJson<ReportBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  let alert = state.engine.submit_alert(actor, body.into()).await?;
  Ok((StatusCode::CREATED, Json(alert)))
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /alerts/{id}`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Alert>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(state.engine.alert(id, actor).await?))
}

/// `GET /alerts/{id}/interventions`
pub async fn interventions<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<Intervention>>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(state.engine.interventions_for_alert(id, actor).await?))
}

// ─── Cancel ──────────────────────────────────────────────────────────────────

/// `POST /alerts/{id}/cancel`
pub async fn cancel<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Alert>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(state.engine.cancel_alert(id, actor).await?))
}
