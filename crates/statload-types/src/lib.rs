//! Shared data model for the statload bulk write engine.
//!
//! Pure data types used across the store, engine, and CLI crates:
//! domain records, table specifications, bulk-operation configuration,
//! the write error taxonomy, and operation/run identifiers.

#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod op;
pub mod record;
