//! Storage backends for the statload bulk write engine.
//!
//! The engine talks to storage exclusively through the [`TableWriter`]
//! and [`RunLog`] traits; [`SqliteWriter`] is the production backend
//! and [`MemoryWriter`] the scriptable test double.

#![warn(clippy::pedantic)]

pub mod memory;
pub mod sqlite;
pub mod writer;

pub use memory::MemoryWriter;
pub use sqlite::SqliteWriter;
pub use writer::{RunLog, RunSummary, TableWriter};
