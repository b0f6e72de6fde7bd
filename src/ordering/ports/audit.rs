//! Audit port for observing successful mutations.
//!
//! Emission is fire-and-forget: the coordinator records after the commit
//! point and never waits on delivery, so a sink can buffer, forward, or drop
//! records without affecting operation outcomes.

use crate::ordering::domain::{ContainerId, ItemId, TenantId, Version};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of mutation an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// A new item was inserted.
    Create,
    /// Caller-owned fields were patched.
    Update,
    /// The item was re-placed within its container.
    Reorder,
    /// The item changed container.
    Move,
    /// The item was soft-deleted.
    Delete,
}

/// One record per successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    /// Item that was written.
    pub item_id: ItemId,
    /// Tenant scope of the operation.
    pub tenant_id: TenantId,
    /// Container the item belongs to after the write.
    pub container_id: ContainerId,
    /// Operation kind.
    pub kind: MutationKind,
    /// Position before the write; `None` for creations.
    pub position_before: Option<i64>,
    /// Position after the write; `None` for deletions.
    pub position_after: Option<i64>,
    /// Version before the write; `None` for creations.
    pub version_before: Option<Version>,
    /// Version after the write.
    pub version_after: Version,
    /// Whether the write renumbered the sibling set.
    pub rebalanced: bool,
    /// When the mutation was committed.
    pub occurred_at: DateTime<Utc>,
}

/// Destination for mutation records.
///
/// Implementations must not fail the caller; delivery problems are theirs to
/// absorb.
pub trait AuditSink: Send + Sync {
    /// Accepts one mutation record.
    fn record(&self, record: MutationRecord);
}

/// Sink that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _record: MutationRecord) {}
}
