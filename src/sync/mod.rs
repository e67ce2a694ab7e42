//! Sync Module
//!
//! The write path: change notifications from the document store are turned into
//! index upserts and deletes.
//!
//! ## Overview
//! Each (collection, event kind) pair has a handler registered in the
//! `SyncHandlerRegistry`. The `SyncDispatcher` consumes the store's change feed and
//! invokes the matching handler; the handler projects the record and writes to the
//! index. Handlers are idempotent and keep no state between events.
//!
//! ## Submodules
//! - **`types`**: `ChangeEvent` and `ChangeKind`.
//! - **`handlers`**: The per-collection `SyncHandler` and handler registration.
//! - **`registry`**: Name-to-closure mapping used for dispatch.
//! - **`dispatcher`**: Feed consumer with per-key ordering and redelivery.

pub mod dispatcher;
pub mod handlers;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;
