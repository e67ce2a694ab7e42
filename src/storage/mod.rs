//! Storage Module
//!
//! The two external collaborators of the sync service and their implementations.
//!
//! ## Core Concepts
//! - **Document store**: Authoritative records, readable by key, publishing a change feed.
//! - **Search index**: Derived projections, written by whole-entry upsert/delete and queried
//!   for ranked keys.
//!
//! ## Submodules
//! - **`provider`**: The `DocumentStore`, `ChangeSource` and `SearchIndex` traits.
//! - **`memory`**: In-process implementations of both collaborators.
//! - **`rest`**: HTTP client for an Algolia-compatible index provider.
//! - **`protocol`**: Endpoint constants and wire DTOs.
//! - **`handlers`**: HTTP handlers for reading and mutating documents.

pub mod handlers;
pub mod memory;
pub mod protocol;
pub mod provider;
pub mod rest;
