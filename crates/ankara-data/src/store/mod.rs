//! Persistent storage for inputs and computed scores.

pub mod sqlite;

pub use sqlite::{SqliteStore, StoreStats};
