//! Bounded fan-out / fan-in over independent fetches.
//!
//! Every identifier runs in its own task gated by a semaphore sized to the
//! worker limit. Tasks report `(identifier, outcome)` over a channel to a single
//! aggregator, so no collection is shared between workers. A failing or
//! panicking fetch is recorded against its identifier and never cancels its
//! siblings.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_WORKERS: usize = 16;

/// Why one identifier produced no result.
#[derive(Debug, Error)]
pub enum TaskFailure<E> {
    #[error("{0}")]
    Failed(E),
    #[error("fetch task panicked: {0}")]
    Panicked(String),
    #[error("fetch task was aborted")]
    Aborted,
}

impl<E> TaskFailure<E> {
    pub fn failed(&self) -> Option<&E> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Panicked(_) | Self::Aborted => None,
        }
    }
}

impl<E> From<JoinError> for TaskFailure<E> {
    fn from(error: JoinError) -> Self {
        if !error.is_panic() {
            return Self::Aborted;
        }
        let payload = error.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| String::from("non-string panic payload"));
        Self::Panicked(message)
    }
}

/// Successes and failures of one batch, in completion order.
#[derive(Debug)]
pub struct BatchOutcome<K, T, E> {
    pub results: Vec<(K, T)>,
    pub errors: Vec<(K, TaskFailure<E>)>,
}

impl<K, T, E> Default for BatchOutcome<K, T, E> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<K: Ord, T, E> BatchOutcome<K, T, E> {
    pub fn attempted(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    /// Both lists ordered by identifier.
    pub fn sorted(mut self) -> Self {
        self.results.sort_by(|left, right| left.0.cmp(&right.0));
        self.errors.sort_by(|left, right| left.0.cmp(&right.0));
        self
    }
}

/// Runs `fetch` once per distinct identifier with at most `max_workers` in flight.
pub async fn fetch_many<K, T, E, F, Fut>(
    identifiers: impl IntoIterator<Item = K>,
    fetch: F,
    max_workers: usize,
) -> BatchOutcome<K, T, E>
where
    K: Ord + Clone + Display + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let identifiers: BTreeSet<K> = identifiers.into_iter().collect();
    let total = identifiers.len();
    let workers = max_workers.max(1);
    info!(total, workers, "starting batch fetch");

    let semaphore = Arc::new(Semaphore::new(workers));
    let fetch = Arc::new(fetch);
    let (sender, mut receiver) = mpsc::channel::<(K, Result<T, TaskFailure<E>>)>(workers);

    for identifier in identifiers {
        let semaphore = Arc::clone(&semaphore);
        let fetch = Arc::clone(&fetch);
        let sender = sender.clone();
        tokio::spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(permit) => {
                    // A panic in the inner task surfaces as a JoinError tied to the identifier.
                    let joined = tokio::spawn(fetch(identifier.clone())).await;
                    drop(permit);
                    match joined {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(error)) => Err(TaskFailure::Failed(error)),
                        Err(error) => Err(TaskFailure::from(error)),
                    }
                }
                Err(_) => Err(TaskFailure::Aborted),
            };
            let _ = sender.send((identifier, outcome)).await;
        });
    }
    drop(sender);

    let mut outcome = BatchOutcome::default();
    while let Some((identifier, result)) = receiver.recv().await {
        match result {
            Ok(value) => {
                debug!(%identifier, completed = outcome.attempted() + 1, total, "fetched");
                outcome.results.push((identifier, value));
            }
            Err(failure) => {
                warn!(%identifier, error = %failure, "fetch failed");
                outcome.errors.push((identifier, failure));
            }
        }
    }

    info!(
        succeeded = outcome.results.len(),
        failed = outcome.errors.len(),
        total,
        "batch fetch finished"
    );
    outcome
}
