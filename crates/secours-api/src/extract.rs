//! Body and path extractors whose rejections render as [`ApiError`].
//!
//! axum's own [`Json`] and [`Path`] answer malformed input with a plain-text
//! `422`/`400`; these wrappers turn every such rejection into the JSON
//! `400 {"error": ...}` shape the rest of the API uses.

use axum::{
  Json,
  extract::{FromRequest, FromRequestParts, Path, Request},
  http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// A JSON request body.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let Json(value) = Json::<T>::from_request(req, state).await?;
    Ok(Self(value))
  }
}

/// Typed path parameters.
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
  T: DeserializeOwned + Send,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
    Ok(Self(value))
  }
}
