//! Durable audit event storage for Parcel.
//!
//! The pipeline only needs bulk append, filtered retrieval, counting and
//! retention deletes. [`AuditStore`] captures that contract; [`SqliteStore`]
//! is the durable backend and [`MemoryStore`] backs tests and single-process
//! deployments.

mod error;
mod filter;
mod memory;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use filter::{AuditFilter, Page};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::AuditStore;
