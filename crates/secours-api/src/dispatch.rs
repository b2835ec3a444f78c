//! Handler for `POST /dispatch`.
//!
//! Body: `{"alertId": "<uuid>", "rescueMemberId": "<uuid>"}`. Returns
//! `201 Created` with the new EN_ROUTE intervention, `409` with a `reason`
//! when the alert or the rescuer is already taken, and `400` with a `reason`
//! when the rescuer is not a valid target.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use secours_core::{fanout::PushGateway, store::EntityStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::Actor, error::ApiError, extract::ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchBody {
  pub alert_id:         Uuid,
  pub rescue_member_id: Uuid,
}

/// `POST /dispatch`
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiJson(body): ApiJson<DispatchBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  let intervention = state
    .engine
    .dispatch(body.alert_id, body.rescue_member_id, actor)
    .await?;
  Ok((StatusCode::CREATED, Json(intervention)))
}
