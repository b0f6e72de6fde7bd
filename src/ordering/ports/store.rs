//! Storage port for tenant-scoped item persistence.
//!
//! The store is the atomic unit of work for this core: `commit` re-reads the
//! current version, applies the guard, the change, and any rebalance batch
//! all-or-nothing; `insert` does the same for a new row. Every read applies
//! the soft-delete predicate and the tenant filter — callers are never
//! trusted to remember either.

use crate::ordering::domain::{
    ContainerId, FieldPatch, Item, ItemId, PositionAssignment, SiblingSnapshot, TenantId, Version,
    VersionGuard,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for item store operations.
pub type ItemStoreResult<T> = Result<T, ItemStoreError>;

/// The state change a single-row write applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemChange {
    /// Merge a caller-owned field patch into the payload.
    Fields(FieldPatch),
    /// Place the item into a container at a position (reorder or move).
    Placement {
        /// Container the item ends up in.
        container_id: ContainerId,
        /// Position within that container.
        position: i64,
    },
    /// Mark the item soft-deleted.
    Delete,
}

/// A guarded write against one item, with an optional rebalance batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemWrite {
    /// Item being written.
    pub id: ItemId,
    /// Tenant scope of the write.
    pub tenant_id: TenantId,
    /// Optimistic-concurrency guard to apply inside the unit of work.
    pub guard: VersionGuard,
    /// The change to apply.
    pub change: ItemChange,
    /// Sibling renumbering applied atomically with the change; empty for
    /// single-row writes.
    pub reassignments: Vec<PositionAssignment>,
    /// Timestamp recorded as `updated_at` on every touched row.
    pub written_at: DateTime<Utc>,
}

/// Item persistence contract.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Inserts a new item, applying any rebalance batch computed for its
    /// placement in the same atomic unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`ItemStoreError::DuplicateItem`] when the identifier already
    /// exists and [`ItemStoreError::PositionTaken`] when the placement would
    /// tie with a concurrently committed sibling.
    async fn insert(
        &self,
        item: &Item,
        reassignments: &[PositionAssignment],
        written_at: DateTime<Utc>,
    ) -> ItemStoreResult<()>;

    /// Finds a non-deleted item scoped to the tenant.
    ///
    /// Returns `None` when the item is absent, soft-deleted, or owned by a
    /// different tenant.
    async fn find_item(&self, id: ItemId, tenant_id: TenantId) -> ItemStoreResult<Option<Item>>;

    /// Lists a container's non-deleted items ordered by position.
    async fn list_items(
        &self,
        container_id: ContainerId,
        tenant_id: TenantId,
    ) -> ItemStoreResult<Vec<Item>>;

    /// Loads the derived sibling view for a container.
    async fn load_siblings(
        &self,
        container_id: ContainerId,
        tenant_id: TenantId,
    ) -> ItemStoreResult<SiblingSnapshot>;

    /// Applies a guarded write atomically and returns the item's new state.
    ///
    /// The store re-reads the stored version inside the unit of work; a
    /// failed guard leaves every row untouched. Reassigned siblings each
    /// have their version incremented by exactly 1. A placement write also
    /// verifies the destination container's no-tie invariant inside the same
    /// unit of work, so a stale snapshot can never persist a tie.
    ///
    /// # Errors
    ///
    /// Returns [`ItemStoreError::NotFound`] when the item is absent,
    /// soft-deleted, or foreign-tenant, [`ItemStoreError::VersionConflict`]
    /// when the guard fails, and [`ItemStoreError::PositionTaken`] when the
    /// write would tie with a concurrently committed sibling.
    async fn commit(&self, write: &ItemWrite) -> ItemStoreResult<Item>;
}

/// Errors returned by item store implementations.
#[derive(Debug, Clone, Error)]
pub enum ItemStoreError {
    /// The stored version did not match the guard's expectation.
    #[error("version conflict on item {id}: expected {expected}, stored {current}")]
    VersionConflict {
        /// Item whose guard failed.
        id: ItemId,
        /// Version the caller expected.
        expected: Version,
        /// Version currently stored.
        current: Version,
    },

    /// The item is absent, soft-deleted, or owned by a different tenant.
    #[error("item not found: {0}")]
    NotFound(ItemId),

    /// An item with the same identifier already exists.
    #[error("duplicate item identifier: {0}")]
    DuplicateItem(ItemId),

    /// The written position was taken by a concurrent writer between
    /// snapshot and commit; the caller re-plans from fresh state.
    #[error("position {position} in container {container_id} is already taken")]
    PositionTaken {
        /// Container whose no-tie invariant the write would break.
        container_id: ContainerId,
        /// The contested position.
        position: i64,
    },

    /// Persistence-layer failure; no partial effect was applied.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl ItemStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
