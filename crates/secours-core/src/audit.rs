//! Structured audit events at component boundaries.
//!
//! The dispatch coordinator and the intervention state machine wrap their
//! public entry points in [`boundary`], which records one `begin` event and
//! one outcome event on the [`TARGET`] tracing target. Nothing else in the
//! crate writes audit events.

use std::future::Future;

use uuid::Uuid;

use crate::{Error, Result};

/// Tracing target for audit events; route it separately with an `EnvFilter`
/// directive such as `secours::audit=info`.
pub const TARGET: &str = "secours::audit";

/// Run `op` and record its entry and outcome.
///
/// `subject` is the primary record the operation acts on (alert or
/// intervention); `actor` is the acting user.
pub async fn boundary<T, F>(
  op: &'static str,
  subject: Uuid,
  actor: Uuid,
  fut: F,
) -> Result<T>
where
  F: Future<Output = Result<T>>,
{
  tracing::info!(target: TARGET, op, %subject, %actor, "begin");
  let outcome = fut.await;
  match &outcome {
    Ok(_) => tracing::info!(target: TARGET, op, %subject, %actor, "ok"),
    Err(e @ Error::Store(_)) => {
      tracing::error!(target: TARGET, op, %subject, %actor, error = %e, "failed")
    }
    Err(e) => {
      tracing::warn!(target: TARGET, op, %subject, %actor, error = %e, "rejected")
    }
  }
  outcome
}
