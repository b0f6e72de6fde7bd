//! Coordinator service for guarded item mutations.
//!
//! Each operation is a single transition: validate the item (existence,
//! tenancy, soft-delete state, guard pre-check), plan the position against
//! the target container's sibling view, then apply one atomic store write.
//! Nothing is mutated before the commit point, so a failed or cancelled
//! operation leaves no partial effect. The store re-applies the guard inside
//! the unit of work; the pre-check here only spares doomed requests the
//! planning work.

use crate::ordering::{
    domain::{
        ContainerId, FieldPatch, InvalidTargetReason, Item, ItemId, PlacementError,
        PlacementTarget, TenantId, Version, VersionGuard, plan_placement,
    },
    ports::{
        AuditSink, ItemChange, ItemStore, ItemStoreError, ItemWrite, MutationKind, MutationRecord,
    },
};
use mockable::Clock;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Placement attempts before a contended container is reported as a storage
/// failure. Each attempt re-plans from a fresh sibling snapshot; the guard is
/// unaffected by sibling writes, so retrying cannot mask a version conflict.
const MAX_PLACEMENT_ATTEMPTS: usize = 3;

/// Request payload for creating an item in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateItemRequest {
    tenant_id: TenantId,
    container_id: ContainerId,
    target: PlacementTarget,
    fields: Map<String, Value>,
}

impl CreateItemRequest {
    /// Creates a request placing the item at the end of the container.
    #[must_use]
    pub fn new(tenant_id: TenantId, container_id: ContainerId) -> Self {
        Self {
            tenant_id,
            container_id,
            target: PlacementTarget::End,
            fields: Map::new(),
        }
    }

    /// Sets the placement target.
    #[must_use]
    pub fn with_target(mut self, target: PlacementTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets the caller-owned payload.
    #[must_use]
    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields = fields;
        self
    }
}

/// Request payload for patching an item's caller-owned fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateItemRequest {
    id: ItemId,
    tenant_id: TenantId,
    guard: VersionGuard,
    patch: FieldPatch,
}

impl UpdateItemRequest {
    /// Creates an update request.
    #[must_use]
    pub fn new(
        id: ItemId,
        tenant_id: TenantId,
        guard: VersionGuard,
        patch: FieldPatch,
    ) -> Self {
        Self {
            id,
            tenant_id,
            guard,
            patch,
        }
    }
}

/// Request payload for re-placing an item within its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderItemRequest {
    id: ItemId,
    tenant_id: TenantId,
    guard: VersionGuard,
    target: PlacementTarget,
}

impl ReorderItemRequest {
    /// Creates a reorder request.
    #[must_use]
    pub const fn new(
        id: ItemId,
        tenant_id: TenantId,
        guard: VersionGuard,
        target: PlacementTarget,
    ) -> Self {
        Self {
            id,
            tenant_id,
            guard,
            target,
        }
    }
}

/// Request payload for moving an item to another container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveItemRequest {
    id: ItemId,
    tenant_id: TenantId,
    guard: VersionGuard,
    target_container_id: ContainerId,
    target: PlacementTarget,
}

impl MoveItemRequest {
    /// Creates a move request appending the item to the target container.
    #[must_use]
    pub const fn new(
        id: ItemId,
        tenant_id: TenantId,
        guard: VersionGuard,
        target_container_id: ContainerId,
    ) -> Self {
        Self {
            id,
            tenant_id,
            guard,
            target_container_id,
            target: PlacementTarget::End,
        }
    }

    /// Sets the placement target within the destination container.
    #[must_use]
    pub const fn with_target(mut self, target: PlacementTarget) -> Self {
        self.target = target;
        self
    }
}

/// Request payload for soft-deleting an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteItemRequest {
    id: ItemId,
    tenant_id: TenantId,
    guard: VersionGuard,
}

impl DeleteItemRequest {
    /// Creates a delete request.
    #[must_use]
    pub const fn new(id: ItemId, tenant_id: TenantId, guard: VersionGuard) -> Self {
        Self {
            id,
            tenant_id,
            guard,
        }
    }
}

/// Service-level errors for ordering operations.
#[derive(Debug, Clone, Error)]
pub enum OrderingError {
    /// The stored version did not match the caller's expectation; re-read
    /// and retry with fresh state. Never retried internally.
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
    /// The three cases are indistinguishable so cross-tenant existence never
    /// leaks.
    #[error("item not found: {0}")]
    NotFound(ItemId),

    /// The placement target cannot be resolved against the destination
    /// container's siblings.
    #[error("invalid placement target: {0}")]
    InvalidTarget(InvalidTargetReason),

    /// An explicitly requested absolute position is held by another sibling
    /// and displacement was not requested.
    #[error("position {position} is already occupied")]
    PositionConflict {
        /// The contested position.
        position: i64,
    },

    /// Opaque storage failure; no partial effect occurred, safe to retry.
    #[error("storage failure: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl From<ItemStoreError> for OrderingError {
    fn from(err: ItemStoreError) -> Self {
        match err {
            ItemStoreError::VersionConflict {
                id,
                expected,
                current,
            } => Self::VersionConflict {
                id,
                expected,
                current,
            },
            ItemStoreError::NotFound(id) => Self::NotFound(id),
            ItemStoreError::DuplicateItem(_)
            | ItemStoreError::PositionTaken { .. }
            | ItemStoreError::Persistence(_) => Self::Storage(Arc::new(err)),
        }
    }
}

impl From<PlacementError> for OrderingError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::Target(reason) => Self::InvalidTarget(reason),
            PlacementError::PositionOccupied(position) => Self::PositionConflict { position },
        }
    }
}

/// Result type for ordering service operations.
pub type OrderingResult<T> = Result<T, OrderingError>;

/// Move/reorder coordinator over a store, an audit sink, and a clock.
#[derive(Clone)]
pub struct OrderingService<S, A, C>
where
    S: ItemStore,
    A: AuditSink,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    audit: Arc<A>,
    clock: Arc<C>,
}

impl<S, A, C> OrderingService<S, A, C>
where
    S: ItemStore,
    A: AuditSink,
    C: Clock + Send + Sync,
{
    /// Creates a new ordering service.
    #[must_use]
    pub const fn new(store: Arc<S>, audit: Arc<A>, clock: Arc<C>) -> Self {
        Self {
            store,
            audit,
            clock,
        }
    }

    /// Creates an item, placing it per the request's target.
    ///
    /// # Errors
    ///
    /// Returns [`OrderingError::InvalidTarget`] or
    /// [`OrderingError::PositionConflict`] when the target cannot be
    /// resolved, and [`OrderingError::Storage`] when persistence fails.
    pub async fn create_item(&self, request: CreateItemRequest) -> OrderingResult<Item> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let siblings = self
                .store
                .load_siblings(request.container_id, request.tenant_id)
                .await?;
            let plan = plan_placement(&siblings, &request.target)?;

            let item = Item::new(
                request.tenant_id,
                request.container_id,
                plan.position(),
                request.fields.clone(),
                &*self.clock,
            );
            match self
                .store
                .insert(&item, plan.reassignments(), item.created_at())
                .await
            {
                // Contention from a concurrent writer invalidates the
                // snapshot, not the request; re-plan from fresh state.
                Err(ItemStoreError::PositionTaken { .. })
                    if attempts < MAX_PLACEMENT_ATTEMPTS => {}
                Err(err) => return Err(err.into()),
                Ok(()) => {
                    self.record_mutation(MutationKind::Create, None, &item, plan.is_rebalance());
                    return Ok(item);
                }
            }
        }
    }

    /// Patches an item's caller-owned fields under the guard.
    ///
    /// # Errors
    ///
    /// Returns [`OrderingError::NotFound`] when the item is not visible to
    /// the tenant and [`OrderingError::VersionConflict`] when the guard
    /// fails.
    pub async fn update_item(&self, request: UpdateItemRequest) -> OrderingResult<Item> {
        let item = self.require_item(request.id, request.tenant_id).await?;
        check_guard(request.id, request.guard, item.version())?;

        let updated = self
            .store
            .commit(&ItemWrite {
                id: request.id,
                tenant_id: request.tenant_id,
                guard: request.guard,
                change: ItemChange::Fields(request.patch),
                reassignments: Vec::new(),
                written_at: self.clock.utc(),
            })
            .await?;

        self.record_mutation(MutationKind::Update, Some(&item), &updated, false);
        Ok(updated)
    }

    /// Re-places an item within its current container.
    ///
    /// # Errors
    ///
    /// Returns [`OrderingError::NotFound`], [`OrderingError::VersionConflict`],
    /// [`OrderingError::InvalidTarget`], or [`OrderingError::PositionConflict`]
    /// per the operation contract.
    pub async fn reorder_item(&self, request: ReorderItemRequest) -> OrderingResult<Item> {
        let item = self.require_item(request.id, request.tenant_id).await?;
        check_guard(request.id, request.guard, item.version())?;

        let updated = self
            .place_item(
                &item,
                item.container_id(),
                &request.target,
                request.guard,
                MutationKind::Reorder,
            )
            .await?;
        Ok(updated)
    }

    /// Moves an item to another container, placing it exactly as a fresh
    /// insertion there. The source container's remaining siblings keep their
    /// positions and versions.
    ///
    /// # Errors
    ///
    /// Returns [`OrderingError::NotFound`], [`OrderingError::VersionConflict`],
    /// [`OrderingError::InvalidTarget`], or [`OrderingError::PositionConflict`]
    /// per the operation contract.
    pub async fn move_item(&self, request: MoveItemRequest) -> OrderingResult<Item> {
        let item = self.require_item(request.id, request.tenant_id).await?;
        check_guard(request.id, request.guard, item.version())?;

        let updated = self
            .place_item(
                &item,
                request.target_container_id,
                &request.target,
                request.guard,
                MutationKind::Move,
            )
            .await?;
        Ok(updated)
    }

    /// Soft-deletes an item under the guard and returns its final state.
    ///
    /// Deleted items disappear from sibling visibility for subsequent
    /// placement computations.
    ///
    /// # Errors
    ///
    /// Returns [`OrderingError::NotFound`] when the item is not visible to
    /// the tenant and [`OrderingError::VersionConflict`] when the guard
    /// fails.
    pub async fn delete_item(&self, request: DeleteItemRequest) -> OrderingResult<Item> {
        let item = self.require_item(request.id, request.tenant_id).await?;
        check_guard(request.id, request.guard, item.version())?;

        let deleted = self
            .store
            .commit(&ItemWrite {
                id: request.id,
                tenant_id: request.tenant_id,
                guard: request.guard,
                change: ItemChange::Delete,
                reassignments: Vec::new(),
                written_at: self.clock.utc(),
            })
            .await?;

        self.record_mutation(MutationKind::Delete, Some(&item), &deleted, false);
        Ok(deleted)
    }

    /// Retrieves an item visible to the tenant.
    ///
    /// # Errors
    ///
    /// Returns [`OrderingError::NotFound`] when the item is absent,
    /// soft-deleted, or owned by a different tenant.
    pub async fn get_item(&self, id: ItemId, tenant_id: TenantId) -> OrderingResult<Item> {
        self.require_item(id, tenant_id).await
    }

    /// Lists a container's non-deleted items ordered by position.
    ///
    /// # Errors
    ///
    /// Returns [`OrderingError::Storage`] when the read fails.
    pub async fn list_items(
        &self,
        container_id: ContainerId,
        tenant_id: TenantId,
    ) -> OrderingResult<Vec<Item>> {
        let items = self.store.list_items(container_id, tenant_id).await?;
        Ok(items)
    }

    /// Plans a placement in the destination container and commits it as one
    /// guarded write. A destination equal to the current container is the
    /// reorder case; the item is stripped from its own sibling view first.
    async fn place_item(
        &self,
        item: &Item,
        destination: ContainerId,
        target: &PlacementTarget,
        guard: VersionGuard,
        kind: MutationKind,
    ) -> OrderingResult<Item> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let siblings = self
                .store
                .load_siblings(destination, item.tenant_id())
                .await?;
            let visible = if destination == item.container_id() {
                siblings.without(item.id())
            } else {
                siblings
            };
            let plan = plan_placement(&visible, target)?;

            let committed = self
                .store
                .commit(&ItemWrite {
                    id: item.id(),
                    tenant_id: item.tenant_id(),
                    guard,
                    change: ItemChange::Placement {
                        container_id: destination,
                        position: plan.position(),
                    },
                    reassignments: plan.reassignments().to_vec(),
                    written_at: self.clock.utc(),
                })
                .await;
            match committed {
                // Contention from a concurrent writer invalidates the
                // snapshot, not the guard; re-plan from fresh state.
                Err(ItemStoreError::PositionTaken { .. })
                    if attempts < MAX_PLACEMENT_ATTEMPTS => {}
                Err(err) => return Err(err.into()),
                Ok(updated) => {
                    self.record_mutation(kind, Some(item), &updated, plan.is_rebalance());
                    return Ok(updated);
                }
            }
        }
    }

    async fn require_item(&self, id: ItemId, tenant_id: TenantId) -> OrderingResult<Item> {
        self.store
            .find_item(id, tenant_id)
            .await?
            .ok_or(OrderingError::NotFound(id))
    }

    fn record_mutation(
        &self,
        kind: MutationKind,
        before: Option<&Item>,
        after: &Item,
        rebalanced: bool,
    ) {
        let position_after = if after.is_deleted() {
            None
        } else {
            Some(after.position())
        };
        self.audit.record(MutationRecord {
            item_id: after.id(),
            tenant_id: after.tenant_id(),
            container_id: after.container_id(),
            kind,
            position_before: before.map(Item::position),
            position_after,
            version_before: before.map(Item::version),
            version_after: after.version(),
            rebalanced,
            occurred_at: after.updated_at(),
        });
    }
}

/// Applies the guard pre-check, mapping a mismatch to the service taxonomy.
const fn check_guard(id: ItemId, guard: VersionGuard, current: Version) -> OrderingResult<()> {
    match guard.check(current) {
        Ok(()) => Ok(()),
        Err(mismatch) => Err(OrderingError::VersionConflict {
            id,
            expected: mismatch.expected,
            current: mismatch.current,
        }),
    }
}
