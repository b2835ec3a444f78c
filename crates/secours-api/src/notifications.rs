//! Handlers for notification endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/notifications` | Administrators; `UNIQUE` or `MASS` body |
//! | `GET`   | `/notifications/unread` | The actor's unread inbox, oldest first |
//! | `PATCH` | `/notifications/{id}/read` | Addressees only |
//!
//! Send body:
//!
//! ```json
//! {"type":"UNIQUE","recipientId":"…","message":"…","title":"…"}
//! {"type":"MASS","target":"RESCUE","message":"…"}
//! ```

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use secours_core::{
  fanout::PushGateway,
  notification::{Audience, Notification},
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

#[derive(Debug, Deserialize)]
pub struct SendBody {
  #[serde(flatten)]
  pub audience: Audience,
  pub message:  String,
  #[serde(default)]
  pub title:    Option<String>,
}

/// `POST /notifications`
pub async fn send<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiJson(body): ApiJson<SendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  let notification = state
    .engine
    .notify(actor, body.audience, body.message, body.title)
    .await?;
  Ok((StatusCode::CREATED, Json(notification)))
}

/// `GET /notifications/unread`
pub async fn unread<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
) -> Result<Json<Vec<Notification>>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(state.engine.unread_notifications(actor).await?))
}

/// `PATCH /notifications/{id}/read`
pub async fn mark_read<S, G>(
  State(state): State<AppState<S, G>>,
  Actor(actor): Actor,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Notification>, ApiError>
where
  S: EntityStore,
  G: PushGateway,
{
  Ok(Json(state.engine.mark_notification_read(id, actor).await?))
}
