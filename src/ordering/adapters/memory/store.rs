//! Thread-safe in-memory item store.
//!
//! The write lock is the atomic unit of work: guard check, change, and
//! rebalance batch all apply under one lock acquisition, staged first so a
//! failed validation leaves the map untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::ordering::{
    domain::{ContainerId, Item, ItemId, PositionAssignment, SiblingEntry, SiblingSnapshot, TenantId},
    ports::{ItemChange, ItemStore, ItemStoreError, ItemStoreResult, ItemWrite},
};

/// In-memory item store for tests and embedded use.
#[derive(Debug, Clone, Default)]
pub struct InMemoryItemStore {
    state: Arc<RwLock<HashMap<ItemId, Item>>>,
}

impl InMemoryItemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl ToString) -> ItemStoreError {
    ItemStoreError::persistence(std::io::Error::other(err.to_string()))
}

/// Returns the stored item when it is visible to the tenant: present, owned
/// by the tenant, and not soft-deleted.
fn visible<'a>(
    items: &'a HashMap<ItemId, Item>,
    id: ItemId,
    tenant_id: TenantId,
) -> Option<&'a Item> {
    items
        .get(&id)
        .filter(|item| item.tenant_id() == tenant_id && !item.is_deleted())
}

/// Verifies the no-tie invariant for a container as it would look once the
/// staged writes apply.
fn verify_no_tie(
    items: &HashMap<ItemId, Item>,
    staged: &[Item],
    container_id: ContainerId,
    tenant_id: TenantId,
) -> ItemStoreResult<()> {
    let staged_ids: HashSet<ItemId> = staged.iter().map(Item::id).collect();
    let mut seen = HashSet::new();
    let overlaid = items
        .values()
        .filter(|item| !staged_ids.contains(&item.id()))
        .chain(staged.iter());

    for item in overlaid {
        let in_scope = item.container_id() == container_id
            && item.tenant_id() == tenant_id
            && !item.is_deleted();
        if in_scope && !seen.insert(item.position()) {
            return Err(ItemStoreError::PositionTaken {
                container_id,
                position: item.position(),
            });
        }
    }
    Ok(())
}

/// Stages renumbered copies of the rebalance batch, validating every target
/// before anything is applied.
fn stage_reassignments(
    items: &HashMap<ItemId, Item>,
    tenant_id: TenantId,
    reassignments: &[PositionAssignment],
    written_at: DateTime<Utc>,
) -> ItemStoreResult<Vec<Item>> {
    let mut staged = Vec::with_capacity(reassignments.len());
    for assignment in reassignments {
        let sibling = visible(items, assignment.id, tenant_id).ok_or_else(|| {
            lock_error(format!(
                "rebalance target {} is not visible to the tenant",
                assignment.id
            ))
        })?;
        let mut renumbered = sibling.clone();
        renumbered.reassign_position(assignment.position, written_at);
        staged.push(renumbered);
    }
    Ok(staged)
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn insert(
        &self,
        item: &Item,
        reassignments: &[PositionAssignment],
        written_at: DateTime<Utc>,
    ) -> ItemStoreResult<()> {
        let mut items = self.state.write().map_err(lock_error)?;
        if items.contains_key(&item.id()) {
            return Err(ItemStoreError::DuplicateItem(item.id()));
        }

        let mut staged = stage_reassignments(&items, item.tenant_id(), reassignments, written_at)?;
        staged.push(item.clone());
        verify_no_tie(&items, &staged, item.container_id(), item.tenant_id())?;

        for written in staged {
            items.insert(written.id(), written);
        }
        Ok(())
    }

    async fn find_item(&self, id: ItemId, tenant_id: TenantId) -> ItemStoreResult<Option<Item>> {
        let items = self.state.read().map_err(lock_error)?;
        Ok(visible(&items, id, tenant_id).cloned())
    }

    async fn list_items(
        &self,
        container_id: ContainerId,
        tenant_id: TenantId,
    ) -> ItemStoreResult<Vec<Item>> {
        let items = self.state.read().map_err(lock_error)?;
        let mut listed: Vec<Item> = items
            .values()
            .filter(|item| {
                item.container_id() == container_id
                    && item.tenant_id() == tenant_id
                    && !item.is_deleted()
            })
            .cloned()
            .collect();
        listed.sort_by_key(Item::position);
        Ok(listed)
    }

    async fn load_siblings(
        &self,
        container_id: ContainerId,
        tenant_id: TenantId,
    ) -> ItemStoreResult<SiblingSnapshot> {
        let listed = self.list_items(container_id, tenant_id).await?;
        let entries = listed
            .iter()
            .map(|item| SiblingEntry {
                id: item.id(),
                position: item.position(),
            })
            .collect();
        Ok(SiblingSnapshot::new(entries))
    }

    async fn commit(&self, write: &ItemWrite) -> ItemStoreResult<Item> {
        let mut items = self.state.write().map_err(lock_error)?;

        let current = visible(&items, write.id, write.tenant_id)
            .ok_or(ItemStoreError::NotFound(write.id))?;
        write
            .guard
            .check(current.version())
            .map_err(|mismatch| ItemStoreError::VersionConflict {
                id: write.id,
                expected: mismatch.expected,
                current: mismatch.current,
            })?;

        let mut updated = current.clone();
        match &write.change {
            ItemChange::Fields(patch) => updated.patch_fields(patch, write.written_at),
            ItemChange::Placement {
                container_id,
                position,
            } => updated.relocate(*container_id, *position, write.written_at),
            ItemChange::Delete => updated.soft_delete(write.written_at),
        }

        let mut staged =
            stage_reassignments(&items, write.tenant_id, &write.reassignments, write.written_at)?;
        staged.push(updated.clone());
        if let ItemChange::Placement { container_id, .. } = &write.change {
            verify_no_tie(&items, &staged, *container_id, write.tenant_id)?;
        }

        for written in staged {
            items.insert(written.id(), written);
        }
        Ok(updated)
    }
}
