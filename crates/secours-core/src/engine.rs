//! [`Engine`] — the entry point for every core operation.
//!
//! The engine holds no mutable state of its own. Correctness under
//! concurrency comes entirely from the store's transactions, so any number of
//! engines (in one process or many) may share a store.

use std::{sync::Arc, time::Duration};

use crate::{
  eligibility::Ranker,
  fanout::{Fanout, FanoutWorker, Notifier, PushGateway},
  store::EntityStore,
};

/// Tunables for [`Engine::start`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Upper bound on a single push-gateway call.
  pub push_timeout:   Duration,
  /// Fan-out events allowed to wait for the worker. Events published while
  /// the queue is full are logged and dropped.
  pub queue_capacity: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { push_timeout: Duration::from_secs(5), queue_capacity: 1024 }
  }
}

pub struct Engine<S, G> {
  store:    Arc<S>,
  notifier: Notifier<S, G>,
  fanout:   Fanout,
  ranker:   Option<Arc<dyn Ranker>>,
}

impl<S, G> Engine<S, G>
where
  S: EntityStore,
  G: PushGateway,
{
  /// Build an engine and spawn its fan-out worker on the current tokio
  /// runtime.
  ///
  /// Await [`FanoutWorker::join`] after dropping the engine to let pending
  /// notifications drain on shutdown.
  pub fn start(
    store: Arc<S>,
    gateway: Arc<G>,
    config: EngineConfig,
  ) -> (Self, FanoutWorker) {
    let notifier = Notifier::new(Arc::clone(&store), gateway, config.push_timeout);
    let (fanout, worker) = Fanout::spawn(notifier.clone(), config.queue_capacity);
    let engine = Self { store, notifier, fanout, ranker: None };
    (engine, worker)
  }

  /// Install a ranking collaborator for [`Engine::candidates`].
  pub fn with_ranker(mut self, ranker: impl Ranker + 'static) -> Self {
    self.ranker = Some(Arc::new(ranker));
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn notifier(&self) -> &Notifier<S, G> { &self.notifier }

  pub fn fanout(&self) -> &Fanout { &self.fanout }

  pub(crate) fn ranker(&self) -> Option<&dyn Ranker> { self.ranker.as_deref() }
}
