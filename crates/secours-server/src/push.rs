//! HTTP push gateway.
//!
//! Posts one JSON request per [`PushMessage`] to the configured provider
//! endpoint, authenticated with a bearer API key. Recipients are addressed by
//! the external user ids registered through `POST /users/{id}/push-ids`.

use std::time::Duration;

use reqwest::Client;
use secours_core::{
  Error, Result,
  fanout::{NoopGateway, PushGateway, PushMessage, PushReceipt},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PushConfig;

// ─── Wire format ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Localised<'a> {
  en: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProviderRequest<'a> {
  app_id:                    &'a str,
  include_external_user_ids: &'a [String],
  headings:                  Localised<'a>,
  contents:                  Localised<'a>,
  data:                      &'a Value,
}

impl<'a> ProviderRequest<'a> {
  pub(crate) fn new(app_id: &'a str, message: &'a PushMessage) -> Self {
    Self {
      app_id,
      include_external_user_ids: &message.target_external_ids,
      headings: Localised { en: &message.title },
      contents: Localised { en: &message.body },
      data: &message.data,
    }
  }
}

/// The provider answers with an id on success and an `errors` value
/// otherwise, sometimes both.
#[derive(Debug, Deserialize)]
struct ProviderReply {
  #[serde(default)]
  id:     Option<String>,
  #[serde(default)]
  errors: Option<Value>,
}

impl ProviderReply {
  fn into_receipt(self) -> Result<PushReceipt> {
    match (self.id, self.errors) {
      (Some(id), _) if !id.is_empty() => Ok(PushReceipt { id }),
      (_, Some(errors)) => Err(Error::DependencyFailure(format!(
        "push provider rejected the message: {errors}"
      ))),
      _ => Err(Error::DependencyFailure(
        "push provider reply carried no id".into(),
      )),
    }
  }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

pub struct HttpPushGateway {
  client:  Client,
  url:     String,
  app_id:  String,
  api_key: String,
}

impl HttpPushGateway {
  pub fn new(config: &PushConfig) -> Result<Self, reqwest::Error> {
    let client = Client::builder()
      .timeout(config.timeout() + Duration::from_secs(1))
      .build()?;
    Ok(Self {
      client,
      url: config.url.clone(),
      app_id: config.app_id.clone(),
      api_key: config.api_key.clone(),
    })
  }
}

impl PushGateway for HttpPushGateway {
  async fn send(&self, message: PushMessage) -> Result<PushReceipt> {
    let resp = self
      .client
      .post(&self.url)
      .bearer_auth(&self.api_key)
      .json(&ProviderRequest::new(&self.app_id, &message))
      .send()
      .await
      .map_err(|e| Error::DependencyFailure(format!("push request failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::DependencyFailure(format!(
        "push provider answered {status}"
      )));
    }

    let reply: ProviderReply = resp.json().await.map_err(|e| {
      Error::DependencyFailure(format!("unreadable push provider reply: {e}"))
    })?;
    reply.into_receipt()
  }
}

/// The gateway chosen at startup from [`PushConfig::enabled`].
pub enum Gateway {
  Http(HttpPushGateway),
  Disabled(NoopGateway),
}

impl Gateway {
  pub fn from_config(config: &PushConfig) -> Result<Self, reqwest::Error> {
    if config.enabled {
      Ok(Self::Http(HttpPushGateway::new(config)?))
    } else {
      Ok(Self::Disabled(NoopGateway))
    }
  }
}

impl PushGateway for Gateway {
  async fn send(&self, message: PushMessage) -> Result<PushReceipt> {
    match self {
      Self::Http(gateway) => gateway.send(message).await,
      Self::Disabled(gateway) => gateway.send(message).await,
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn message() -> PushMessage {
    PushMessage {
      target_external_ids: vec!["dev-1".into(), "dev-2".into()],
      title:               "Intervention update".into(),
      body:                "Rescuer on site".into(),
      data:                json!({ "kind": "SUR_PLACE", "alertId": "a" }),
    }
  }

  #[test]
  fn request_body_matches_the_provider_shape() {
    let message = message();
    let body = serde_json::to_value(ProviderRequest::new("app-1", &message)).unwrap();
    assert_eq!(
      body,
      json!({
        "app_id": "app-1",
        "include_external_user_ids": ["dev-1", "dev-2"],
        "headings": { "en": "Intervention update" },
        "contents": { "en": "Rescuer on site" },
        "data": { "kind": "SUR_PLACE", "alertId": "a" },
      })
    );
  }

  #[test]
  fn replies_with_an_id_are_receipts() {
    let reply: ProviderReply =
      serde_json::from_value(json!({ "id": "n-1", "recipients": 2 })).unwrap();
    assert_eq!(reply.into_receipt().unwrap().id, "n-1");
  }

  #[test]
  fn replies_with_errors_are_dependency_failures() {
    let reply: ProviderReply = serde_json::from_value(json!({
      "id": "",
      "errors": ["All included players are not subscribed"],
    }))
    .unwrap();
    assert!(matches!(reply.into_receipt(), Err(Error::DependencyFailure(_))));

    let empty: ProviderReply = serde_json::from_value(json!({})).unwrap();
    assert!(matches!(empty.into_receipt(), Err(Error::DependencyFailure(_))));
  }

  #[tokio::test]
  async fn disabled_gateway_accepts_everything() {
    let gateway = Gateway::from_config(&PushConfig::default()).unwrap();
    assert!(matches!(gateway, Gateway::Disabled(_)));
    assert!(gateway.send(message()).await.is_ok());
  }
}
