//! Port contracts for the ordering core's collaborators.

pub mod audit;
pub mod store;

pub use audit::{AuditSink, MutationKind, MutationRecord, NullAuditSink};
pub use store::{ItemChange, ItemStore, ItemStoreError, ItemStoreResult, ItemWrite};
