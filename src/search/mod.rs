//! Search Service Module
//!
//! The read path: a query goes to the search index, and the returned keys are
//! hydrated into full records from the document store.
//!
//! ## Responsibilities
//! - **Filtering**: Turning `;`-separated category lists into the index's filter syntax.
//! - **Retrieval**: Querying the index and keeping its ranking order.
//! - **Hydration**: Resolving keys to records concurrently, skipping records deleted
//!   since they were indexed.
//! - **API**: Exposing search over HTTP.
//!
//! ## Submodules
//! - **`filter`**: The filter expression builder.
//! - **`engine`**: `SearchService` and hydration.
//! - **`handlers`**: HTTP request handlers for the Axum web server.
//! - **`types`**: Query parameters and error bodies.

pub mod engine;
pub mod filter;
pub mod handlers;
pub mod types;
