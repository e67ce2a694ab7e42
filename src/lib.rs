//! Search Index Synchronization Library
//!
//! Keeps a search index eventually consistent with a document store and serves
//! search queries by hydrating index hits with canonical records.
//!
//! ## Architecture Modules
//! - **`projection`**: Pure mapping from records to the fields stored in the index.
//! - **`sync`**: The write path. Change events are dispatched to idempotent handlers
//!   that upsert or delete index entries.
//! - **`search`**: The read path. Category filter building, index queries and
//!   concurrent hydration that keeps the index's ranking order.
//! - **`storage`**: Traits for the document store and the index, with in-memory and
//!   REST implementations.
//! - **`context`**: Shared client handles, initialized once per process.

pub mod config;
pub mod context;
pub mod error;
pub mod projection;
pub mod search;
pub mod storage;
pub mod sync;

pub use error::{Result, SyncError};
