//! Handlers for rescue services and rescue member profiles.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/rescue-services` | Body: `{"name":"…"}` |
//! | `PATCH` | `/rescue-services/{id}/active` | Body: `{"active":false}` |
//! | `POST`  | `/rescue-members` | 409 on duplicate badge or account |
//! | `PATCH` | `/rescue-members/{id}/duty` | Body: `{"onDuty":true}`; self or admin |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use secours_core::{
  fanout::PushGateway,
  rescue::{NewRescueMember, RescueMember, RescueService},
  store::EntityStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Actor,
  error::ApiError,
  extract::{ApiJson, ApiPath},
  users::ActiveBody,
};

// ─── Services ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ServiceBody {
  pub name: String,
}

/// `POST /rescue-services`
pub async fn create_service<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiJson(body): ApiJson<ServiceBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  let service = state.engine.create_rescue_service(actor, body.name).await?;
  Ok((StatusCode::CREATED, Json(service)))
}

/// `PATCH /rescue-services/{id}/active`
pub async fn set_service_active<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<ActiveBody>,
) -> Result<Json<RescueService>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(
    state
      .engine
      .set_rescue_service_active(actor, id, body.active)
      .await?,
  ))
}

// ─── Members ─────────────────────────────────────────────────────────────────

/// `POST /rescue-members`
pub async fn create_member<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiJson(body): ApiJson<NewRescueMember>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  let member = state.engine.register_rescue_member(actor, body).await?;
  Ok((StatusCode::CREATED, Json(member)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DutyBody {
  pub on_duty: bool,
}

/// `PATCH /rescue-members/{id}/duty`
pub async fn set_duty<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<DutyBody>,
) -> Result<Json<RescueMember>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(state.engine.set_on_duty(actor, id, body.on_duty).await?))
}
