//! Service authentication and acting-user resolution.
//!
//! The API sits behind a trusted gateway. The gateway proves itself with
//! HTTP Basic credentials checked against an argon2 hash, and names the user
//! it acts for in the [`ACTOR_HEADER`] header. [`Actor`] resolves that user
//! through the entity store into a [`Principal`].

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use secours_core::{
  Error as CoreError, fanout::PushGateway, store::EntityStore, user::Principal,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Header carrying the acting user's id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify the service credential from request headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;

  if username != config.username {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash =
    PasswordHash::new(&config.password_hash).map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(())
}

/// The authenticated acting user. Present in a handler means the service
/// credential was valid and the actor exists and is active.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub Principal);

fn actor_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
  headers
    .get(ACTOR_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| Uuid::parse_str(v.trim()).ok())
    .ok_or(ApiError::Unauthorized)
}

impl<S, G> FromRequestParts<AppState<S, G>> for Actor
where
  S: EntityStore,
  G: PushGateway,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, G>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth)?;
    let id = actor_id(&parts.headers)?;

    let user = state
      .engine
      .store()
      .get_user(id)
      .await
      .map_err(|e| ApiError::Core(e.into()))?
      .ok_or_else(|| {
        tracing::debug!(actor = %id, "unknown acting user");
        ApiError::Unauthorized
      })?;

    let principal = Principal::from(&user);
    if !principal.is_active {
      return Err(CoreError::forbidden(format!("account {id} is inactive")).into());
    }
    Ok(Actor(principal))
  }
}

#[cfg(test)]
mod tests {
  use argon2::{Algorithm, Params, PasswordHasher, Version, password_hash::SaltString};
  use axum::http::{HeaderValue, header};
  use rand_core::OsRng;

  use super::*;

  fn config(password: &str) -> AuthConfig {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(1024, 1, 1, None).unwrap();
    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AuthConfig { username: "gateway".into(), password_hash: hash }
  }

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn correct_credentials() {
    let config = config("secret");
    assert!(verify_auth(&headers(&basic("gateway", "secret")), &config).is_ok());
  }

  #[test]
  fn wrong_password_or_user() {
    let config = config("secret");
    for value in [basic("gateway", "wrong"), basic("intruder", "secret")] {
      assert!(matches!(
        verify_auth(&headers(&value), &config),
        Err(ApiError::Unauthorized)
      ));
    }
  }

  #[test]
  fn missing_or_malformed_header() {
    let config = config("secret");
    assert!(matches!(
      verify_auth(&HeaderMap::new(), &config),
      Err(ApiError::Unauthorized)
    ));
    assert!(matches!(
      verify_auth(&headers("Basic !!!not-base64!!!"), &config),
      Err(ApiError::Unauthorized)
    ));
    assert!(matches!(
      verify_auth(&headers("Bearer abc"), &config),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn actor_id_must_be_a_uuid() {
    let mut headers = HeaderMap::new();
    assert!(actor_id(&headers).is_err());
    headers.insert(ACTOR_HEADER, HeaderValue::from_static("admin"));
    assert!(actor_id(&headers).is_err());
    let id = Uuid::new_v4();
    headers.insert(ACTOR_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
    assert_eq!(actor_id(&headers).unwrap(), id);
  }
}
