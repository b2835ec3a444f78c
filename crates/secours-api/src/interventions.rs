//! Handlers for intervention endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `PATCH` | `/intervention/{id}/status` | Body: `{"status":"SUR_PLACE","notes":"…"}` |
//! | `GET`   | `/interventions/{id}` | 404 if not found |

use axum::{
  Json,
  extract::State,
};
use secours_core::{
  fanout::PushGateway,
  intervention::{Intervention, InterventionStatus},
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

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: InterventionStatus,
  #[serde(default)]
  pub notes:  Option<String>,
}

/// `PATCH /intervention/{id}/status`
///
/// An illegal move answers `400` with `current` and `validNextStates`; a
/// caller who is neither the assignee nor an administrator gets `403`.
pub async fn set_status<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<StatusBody>,
) -> Result<Json<Intervention>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  let intervention = state
    .engine
    .transition(id, body.status, actor, body.notes)
    .await?;
  Ok(Json(intervention))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /interventions/{id}`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Intervention>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(state.engine.intervention(id, actor).await?))
}
