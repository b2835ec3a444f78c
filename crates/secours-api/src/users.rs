//! Handlers for account administration.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use secours_core::{
  fanout::PushGateway,
  store::EntityStore,
  user::{NewUser, User},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Actor,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

/// `POST /users`
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiJson(body): ApiJson<NewUser>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  let user = state.engine.create_user(actor, body).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `PATCH /users/{id}/active`
pub async fn set_active<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<ActiveBody>,
) -> Result<Json<User>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(state.engine.set_user_active(actor, id, body.active).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushIdBody {
  pub external_id: String,
}

/// `POST /users/{id}/push-ids`
///
/// Registering the same identifier twice is a no-op.
pub async fn register_push_id<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<PushIdBody>,
) -> Result<StatusCode, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  state
    .engine
    .register_push_identifier(actor, id, body.external_id)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}
