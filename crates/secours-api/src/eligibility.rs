//! Handler for `GET /eligibility/{alertId}`: the ordered candidate list.

use axum::{Json, extract::State};
use secours_core::{eligibility::Candidates, fanout::PushGateway, store::EntityStore};
use uuid::Uuid;

use crate::{AppState, auth::Actor, error::ApiError, extract::ApiPath};

/// `GET /eligibility/{alert_id}`
///
/// Restricted to administrators and rescuers; 404 when the alert is unknown
/// or closed.
pub async fn candidates<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(alert_id): ApiPath<Uuid>,
) -> Result<Json<Candidates>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(state.engine.candidates(alert_id, actor).await?))
}
