//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use secours_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler or extractor.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or wrong service credential, or an unknown acting user.
  #[error("unauthorized")]
  Unauthorized,

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A body that is not JSON or does not fit the expected shape, including
  /// unknown enum values and malformed ids.
  #[error("invalid request body: {}", .0.body_text())]
  Body(#[from] JsonRejection),

  #[error("invalid path: {}", .0.body_text())]
  Path(#[from] PathRejection),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = self.to_string();
    let (status, body) = match self {
      ApiError::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": message })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"secours\""),
        );
        return res;
      }
      ApiError::BadRequest(_) | ApiError::Body(_) | ApiError::Path(_) => {
        (StatusCode::BAD_REQUEST, json!({ "error": message }))
      }
      ApiError::Core(CoreError::NotFound { entity, id }) => (
        StatusCode::NOT_FOUND,
        json!({ "error": message, "entity": entity, "id": id }),
      ),
      ApiError::Core(CoreError::Conflict(reason)) => (
        StatusCode::CONFLICT,
        json!({ "error": message, "reason": reason }),
      ),
      ApiError::Core(CoreError::InvalidTarget { id, reason }) => (
        StatusCode::BAD_REQUEST,
        json!({ "error": message, "rescueMemberId": id, "reason": reason }),
      ),
      ApiError::Core(CoreError::InvalidTransition {
        current,
        requested,
        valid_next,
      }) => (
        StatusCode::BAD_REQUEST,
        json!({
          "error": message,
          "current": current,
          "requested": requested,
          "validNextStates": valid_next,
        }),
      ),
      ApiError::Core(CoreError::Forbidden(_)) => {
        (StatusCode::FORBIDDEN, json!({ "error": message }))
      }
      ApiError::Core(CoreError::Validation(_)) => {
        (StatusCode::BAD_REQUEST, json!({ "error": message }))
      }
      ApiError::Core(CoreError::DependencyFailure(_)) => {
        (StatusCode::BAD_GATEWAY, json!({ "error": message }))
      }
      ApiError::Core(CoreError::Store(e)) => {
        tracing::error!(error = %e, "store failure");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          json!({ "error": "internal store error" }),
        )
      }
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use axum::body::to_bytes;
  use secours_core::{
    error::{ConflictReason, Entity},
    intervention::InterventionStatus,
  };
  use serde_json::Value;
  use uuid::Uuid;

  use super::*;

  async fn render(err: ApiError) -> (StatusCode, Value) {
    let res = err.into_response();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn conflicts_carry_their_reason() {
    let (status, body) =
      render(CoreError::Conflict(ConflictReason::RescuerBusy).into()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["reason"], "rescuer_busy");
  }

  #[tokio::test]
  async fn invalid_transitions_list_the_valid_next_states() {
    let (status, body) = render(
      CoreError::InvalidTransition {
        current:    InterventionStatus::EnRoute,
        requested:  InterventionStatus::Terminee,
        valid_next: InterventionStatus::EnRoute.allowed_next_states().to_vec(),
      }
      .into(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["current"], "EN_ROUTE");
    assert_eq!(body["validNextStates"], serde_json::json!(["SUR_PLACE", "ANNULEE"]));
  }

  #[tokio::test]
  async fn store_failures_do_not_leak_details() {
    let inner = std::io::Error::other("disk on fire");
    let (status, body) = render(CoreError::store(inner).into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().contains("disk"));
  }

  #[tokio::test]
  async fn not_found_names_the_entity() {
    let id = Uuid::new_v4();
    let (status, body) =
      render(CoreError::not_found(Entity::Alert, id).into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["entity"], "alert");
    assert_eq!(body["id"], id.to_string());
  }

  #[test]
  fn unauthorized_challenges_for_basic_credentials() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      res.headers()[header::WWW_AUTHENTICATE],
      "Basic realm=\"secours\""
    );
  }
}
