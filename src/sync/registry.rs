//! Sync Handler Registry
//!
//! Maps handler names of the form `<collection>.<kind>` (e.g. `questions.created`)
//! to async closures. The dispatcher delivers each `ChangeEvent` to the handler
//! registered under the event's name; how a handler is wired to an event source
//! is not the handler's concern.

use super::types::ChangeEvent;
use crate::error::{Result, SyncError};

use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type-erased async handler taking ownership of the event it processes.
pub type SyncHandlerFn =
    Arc<dyn Fn(ChangeEvent) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

#[derive(Default)]
pub struct SyncHandlerRegistry {
    handlers: DashMap<String, SyncHandlerFn>,
}

impl SyncHandlerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `handler` under `handler_name`, replacing any previous one.
    pub fn register<F, Fut>(&self, handler_name: &str, handler: F)
    where
        F: Fn(ChangeEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler_fn: SyncHandlerFn = Arc::new(move |event: ChangeEvent| {
            Box::pin(handler(event)) as Pin<Box<dyn Future<Output = Result<()>> + Send>>
        });

        self.handlers.insert(handler_name.to_string(), handler_fn);

        tracing::info!("Registered sync handler: {}", handler_name);
    }

    /// Runs the handler registered for `event`.
    ///
    /// # Returns
    /// * `Ok(())` if the handler completed.
    /// * `Err` if the handler failed or no handler matches the event.
    pub async fn dispatch(&self, event: &ChangeEvent) -> Result<()> {
        let name = event.handler_name();
        // Clone the Arc out so no map guard is held across the await.
        let handler_fn = self.handlers.get(&name).map(|entry| entry.value().clone());

        match handler_fn {
            Some(handler_fn) => {
                tracing::debug!("Dispatching event {} to '{}'", event.event_id, name);
                handler_fn(event.clone()).await
            }
            None => {
                let error = format!("Unknown sync handler: {}", name);
                tracing::error!("{}", error);
                Err(SyncError::Configuration(error))
            }
        }
    }

    pub fn list_handlers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn has_handler(&self, handler_name: &str) -> bool {
        self.handlers.contains_key(handler_name)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}
