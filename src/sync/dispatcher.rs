//! Change Event Dispatcher
//!
//! Delivers change events from a feed to the `SyncHandlerRegistry`.
//!
//! ## Responsibilities
//! - **Ordering**: Events are routed to a worker by hashing `collection/key`, so every
//!   event for one key is handled by the same worker in arrival order while different
//!   keys proceed in parallel.
//! - **Redelivery**: Retryable failures are redelivered with exponential backoff and
//!   jitter until `max_attempts` is reached; the event is then parked in the
//!   dead-letter list, where it stays visible to operators.

use super::registry::SyncHandlerRegistry;
use super::types::ChangeEvent;
use crate::error::Result;

use axum::{Extension, Json};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    /// Total delivery attempts per event, including the first one.
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(150),
            max_backoff: Duration::from_millis(1200),
        }
    }
}

pub struct SyncDispatcher {
    registry: Arc<SyncHandlerRegistry>,
    worker_count: usize,
    policy: DeliveryPolicy,
    dead_letters: DashMap<u64, DeadLetter>,
    next_letter: AtomicU64,
}

/// An event whose delivery failed for good.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub event: ChangeEvent,
    pub error: String,
}

impl SyncDispatcher {
    pub fn new(
        registry: Arc<SyncHandlerRegistry>,
        worker_count: usize,
        policy: DeliveryPolicy,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            worker_count: worker_count.max(1),
            policy,
            dead_letters: DashMap::new(),
            next_letter: AtomicU64::new(0),
        })
    }

    pub fn dead_letter_count(&self) -> usize {
        self.dead_letters.len()
    }

    /// Undeliverable events, oldest first.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        let mut letters: Vec<(u64, DeadLetter)> = self
            .dead_letters
            .iter()
            .map(|letter| (*letter.key(), letter.value().clone()))
            .collect();
        letters.sort_by_key(|(sequence, _)| *sequence);
        letters.into_iter().map(|(_, letter)| letter).collect()
    }

    /// Index of the worker responsible for a key.
    pub fn worker_for(&self, collection: &str, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        collection.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() % self.worker_count as u64) as usize
    }

    /// Spawns the workers and the routing loop. The returned handle finishes
    /// once the feed closes and every worker has drained its queue.
    pub fn start(self: Arc<Self>, mut feed: mpsc::UnboundedReceiver<ChangeEvent>) -> JoinHandle<()> {
        tracing::info!("Starting sync dispatcher with {} workers", self.worker_count);

        let mut senders = Vec::with_capacity(self.worker_count);
        let mut workers = Vec::with_capacity(self.worker_count);
        for worker_id in 0..self.worker_count {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            let dispatcher = self.clone();
            workers.push(tokio::spawn(async move {
                dispatcher.worker_loop(worker_id, rx).await;
            }));
        }

        tokio::spawn(async move {
            while let Some(event) = feed.recv().await {
                let worker = self.worker_for(&event.collection, &event.key);
                if let Err(mpsc::error::SendError(event)) = senders[worker].send(event) {
                    tracing::error!("Worker {} stopped", worker);
                    self.park(event, "sync worker stopped".to_string());
                }
            }
            tracing::info!("Change feed closed, stopping dispatcher");

            drop(senders);
            for worker in workers {
                let _ = worker.await;
            }
        })
    }

    async fn worker_loop(&self, worker_id: usize, mut rx: mpsc::UnboundedReceiver<ChangeEvent>) {
        tracing::debug!("Sync worker {} started", worker_id);

        while let Some(event) = rx.recv().await {
            if !self.registry.has_handler(&event.handler_name()) {
                tracing::trace!("No handler for {}, skipping", event.handler_name());
                continue;
            }

            match self.deliver(&event).await {
                Ok(()) => {
                    tracing::debug!(
                        "Worker {} applied {} for {}/{}",
                        worker_id,
                        event.kind,
                        event.collection,
                        event.key
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "Dead-lettering event {} ({} {}/{}): {}",
                        event.event_id,
                        event.kind,
                        event.collection,
                        event.key,
                        e
                    );
                    self.park(event, e.to_string());
                }
            }
        }

        tracing::debug!("Sync worker {} stopped", worker_id);
    }

    fn park(&self, event: ChangeEvent, error: String) {
        let sequence = self.next_letter.fetch_add(1, Ordering::SeqCst);
        self.dead_letters.insert(sequence, DeadLetter { event, error });
    }

    /// Dispatches one event, redelivering retryable failures per the policy.
    pub async fn deliver(&self, event: &ChangeEvent) -> Result<()> {
        let attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.initial_backoff;
        let mut attempt = 1;

        loop {
            match self.registry.dispatch(event).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_retryable() || attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Delivery {}/{} of event {} failed: {}",
                        attempt,
                        attempts,
                        event.event_id,
                        e
                    );
                    let jitter = Duration::from_millis(rand::random::<u64>() % 50);
                    tokio::time::sleep(delay + jitter).await;
                    delay = (delay * 2).min(self.policy.max_backoff);
                    attempt += 1;
                }
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` once any event has been dead-lettered.
    pub status: String,
    pub dead_letters: usize,
}

pub async fn handle_health(
    Extension(dispatcher): Extension<Arc<SyncDispatcher>>,
) -> Json<HealthResponse> {
    let dead_letters = dispatcher.dead_letter_count();
    let status = if dead_letters == 0 { "ok" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        dead_letters,
    })
}
