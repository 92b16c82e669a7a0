//! Glue between the command line and the analytics crates.
//!
//! Database location handling, file imports with progress reporting and
//! joining the engine tasks.

pub(crate) mod ingest;
pub(crate) mod store_location;
pub(crate) mod tasks;
