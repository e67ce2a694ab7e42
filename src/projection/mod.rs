//! Projection Module
//!
//! Converts canonical records into the reduced entries stored in the search index.
//!
//! ## Overview
//! Every record type has a fixed `RecordSchema` naming the fields copied into the index.
//! The mapper is a pure function: the same record and schema always yield the same
//! `IndexEntry`, which carries exactly the declared fields plus the `objectID` identity field.
//!
//! ## Submodules
//! - **`mapper`**: The `project` function.
//! - **`types`**: Records, schemas, index entries and the schema catalog.

pub mod mapper;
pub mod types;
