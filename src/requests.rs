//! Request-scoped cancellation for recommendation requests
//!
//! Each (metric, window) pair has a slot. Starting a request bumps the slot's
//! generation and cancels whatever was still in flight for it, so a slower,
//! older response can never overwrite a newer one.

use crate::models::{MetricKind, TimeRange};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub type RequestKey = (MetricKind, TimeRange);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RequestOutcome<T> {
  Delivered(T),
  /// A newer request for the same slot started first
  Superseded,
  /// The caller went away
  Cancelled,
}

impl<T> RequestOutcome<T> {
  pub fn delivered(self) -> Option<T> {
    match self {
      RequestOutcome::Delivered(value) => Some(value),
      _ => None,
    }
  }
}

struct Slot<T> {
  generation: u64,
  in_flight: Option<CancellationToken>,
  latest: Option<T>,
}

impl<T> Default for Slot<T> {
  fn default() -> Self {
    Self {
      generation: 0,
      in_flight: None,
      latest: None,
    }
  }
}

/// Handle for one started request
#[derive(Debug, Clone)]
pub struct RequestTicket {
  pub key: RequestKey,
  pub generation: u64,
  pub token: CancellationToken,
}

pub struct RequestRegistry<T> {
  slots: Mutex<HashMap<RequestKey, Slot<T>>>,
}

impl<T> Default for RequestRegistry<T> {
  fn default() -> Self {
    Self {
      slots: Mutex::new(HashMap::new()),
    }
  }
}

impl<T: Clone> RequestRegistry<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start a request, cancelling the previous one for the same key.
  /// The returned token is a child of `parent`.
  pub fn begin(&self, key: RequestKey, parent: &CancellationToken) -> RequestTicket {
    let mut slots = self.slots.lock();
    let slot = slots.entry(key).or_default();

    if let Some(previous) = slot.in_flight.take() {
      tracing::debug!(metric = %key.0, range = key.1.as_str(), "Superseding in-flight request");
      previous.cancel();
    }

    slot.generation += 1;
    let token = parent.child_token();
    slot.in_flight = Some(token.clone());

    RequestTicket {
      key,
      generation: slot.generation,
      token,
    }
  }

  /// Publish a finished result if the ticket is still current
  pub fn complete(&self, ticket: &RequestTicket, value: T) -> RequestOutcome<T> {
    let mut slots = self.slots.lock();
    let slot = slots.entry(ticket.key).or_default();

    if slot.generation != ticket.generation {
      return RequestOutcome::Superseded;
    }

    slot.in_flight = None;
    if ticket.token.is_cancelled() {
      return RequestOutcome::Cancelled;
    }

    slot.latest = Some(value.clone());
    RequestOutcome::Delivered(value)
  }

  /// Give up on a request without publishing anything
  pub fn abandon(&self, ticket: &RequestTicket) -> RequestOutcome<T> {
    let mut slots = self.slots.lock();
    let slot = slots.entry(ticket.key).or_default();

    if slot.generation != ticket.generation {
      return RequestOutcome::Superseded;
    }

    slot.in_flight = None;
    RequestOutcome::Cancelled
  }

  /// Run `work` as the current request for `key`
  pub async fn run<F, Fut>(&self, key: RequestKey, parent: &CancellationToken, work: F) -> RequestOutcome<T>
  where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = T>,
  {
    let ticket = self.begin(key, parent);

    let result = tokio::select! {
      biased;
      _ = ticket.token.cancelled() => None,
      value = work(ticket.token.clone()) => Some(value),
    };

    match result {
      Some(value) => self.complete(&ticket, value),
      None => self.abandon(&ticket),
    }
  }

  /// Last delivered value for `key`
  pub fn latest(&self, key: RequestKey) -> Option<T> {
    self.slots.lock().get(&key).and_then(|slot| slot.latest.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  const KEY: RequestKey = (MetricKind::Speed, TimeRange::Week);

  #[test]
  fn test_stale_ticket_cannot_publish() {
    let registry = RequestRegistry::<u32>::new();
    let root = CancellationToken::new();

    let old = registry.begin(KEY, &root);
    let new = registry.begin(KEY, &root);
    assert!(old.token.is_cancelled());

    assert_eq!(registry.complete(&new, 2), RequestOutcome::Delivered(2));
    assert_eq!(registry.complete(&old, 1), RequestOutcome::Superseded);
    assert_eq!(registry.latest(KEY), Some(2));
  }

  #[test]
  fn test_keys_are_independent() {
    let registry = RequestRegistry::<u32>::new();
    let root = CancellationToken::new();

    let speed = registry.begin(KEY, &root);
    let other = registry.begin((MetricKind::Speed, TimeRange::Year), &root);
    assert!(!speed.token.is_cancelled());

    assert_eq!(registry.complete(&speed, 1), RequestOutcome::Delivered(1));
    assert_eq!(registry.complete(&other, 5), RequestOutcome::Delivered(5));
    assert_eq!(registry.latest(KEY), Some(1));
  }

  #[tokio::test]
  async fn test_run_cancelled_by_parent() {
    let registry = RequestRegistry::<u32>::new();
    let root = CancellationToken::new();

    let canceller = root.clone();
    let outcome = registry
      .run(KEY, &root, |_| async move {
        canceller.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        7
      })
      .await;

    assert_eq!(outcome, RequestOutcome::Cancelled);
    assert_eq!(registry.latest(KEY), None);
  }

  #[tokio::test]
  async fn test_run_superseded_by_newer_request() {
    let registry = RequestRegistry::<u32>::new();
    let root = CancellationToken::new();

    let slow = registry.run(KEY, &root, |_| async {
      tokio::time::sleep(Duration::from_millis(300)).await;
      1
    });
    let fast = async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      registry.run(KEY, &root, |_| async { 2 }).await
    };

    let (slow_outcome, fast_outcome) = tokio::join!(slow, fast);
    assert_eq!(slow_outcome, RequestOutcome::Superseded);
    assert_eq!(fast_outcome, RequestOutcome::Delivered(2));
    assert_eq!(registry.latest(KEY), Some(2));
  }
}
