//! Bulk write engine: validates records, plans batches, resolves key
//! conflicts, and drives retried writes through a storage backend.

#![warn(clippy::pedantic)]

pub mod cancel;
pub mod config;
pub mod conflict;
pub mod coordinator;
pub mod pipeline;
pub mod planner;
pub mod result;
pub mod retry;
pub mod validate;

pub use cancel::CancelToken;
pub use coordinator::{run_operation, OperationOptions, OperationReport, TableLoad};
pub use result::BulkWriteResult;
