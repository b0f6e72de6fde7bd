//! Item aggregate root and the field-patch value object.

use super::ids::{ContainerId, ItemId, TenantId};
use super::version::Version;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-owned field changes applied by an update.
///
/// The payload is opaque to this core; schema validation happens in the
/// request layer. A `null` value removes the key, any other value replaces
/// it, following JSON merge-patch semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPatch {
    entries: Map<String, Value>,
}

impl FieldPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a patch from a prepared JSON object.
    #[must_use]
    pub const fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Sets one field change.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    /// Returns `true` when the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the patch entries.
    #[must_use]
    pub const fn entries(&self) -> &Map<String, Value> {
        &self.entries
    }
}

/// A positioned, versioned entity belonging to exactly one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    tenant_id: TenantId,
    container_id: ContainerId,
    position: i64,
    version: Version,
    fields: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted item aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedItemData {
    /// Persisted item identifier.
    pub id: ItemId,
    /// Persisted tenant key.
    pub tenant_id: TenantId,
    /// Persisted owning container.
    pub container_id: ContainerId,
    /// Persisted sort position.
    pub position: i64,
    /// Persisted version counter.
    pub version: Version,
    /// Persisted caller-owned payload.
    pub fields: Map<String, Value>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest mutation timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted soft-delete marker, if any.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Creates a new item at the given position with version 1.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        container_id: ContainerId,
        position: i64,
        fields: Map<String, Value>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ItemId::new(),
            tenant_id,
            container_id,
            position,
            version: Version::INITIAL,
            fields,
            created_at: timestamp,
            updated_at: timestamp,
            deleted_at: None,
        }
    }

    /// Reconstructs an item from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedItemData) -> Self {
        Self {
            id: data.id,
            tenant_id: data.tenant_id,
            container_id: data.container_id,
            position: data.position,
            version: data.version,
            fields: data.fields,
            created_at: data.created_at,
            updated_at: data.updated_at,
            deleted_at: data.deleted_at,
        }
    }

    /// Returns the item identifier.
    #[must_use]
    pub const fn id(&self) -> ItemId {
        self.id
    }

    /// Returns the tenant key.
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the owning container.
    #[must_use]
    pub const fn container_id(&self) -> ContainerId {
        self.container_id
    }

    /// Returns the sort position among non-deleted siblings.
    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }

    /// Returns the optimistic-concurrency version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Returns the caller-owned payload.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the soft-delete timestamp, if any.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns `true` when the item has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Merges a field patch into the payload and counts the write.
    pub fn patch_fields(&mut self, patch: &FieldPatch, written_at: DateTime<Utc>) {
        for (key, value) in patch.entries() {
            if value.is_null() {
                self.fields.remove(key);
            } else {
                self.fields.insert(key.clone(), value.clone());
            }
        }
        self.record_write(written_at);
    }

    /// Places the item into a container at a position and counts the write.
    ///
    /// This is the only path that changes `container_id`.
    pub fn relocate(
        &mut self,
        container_id: ContainerId,
        position: i64,
        written_at: DateTime<Utc>,
    ) {
        self.container_id = container_id;
        self.position = position;
        self.record_write(written_at);
    }

    /// Renumbers the item within its container during a rebalance batch and
    /// counts the write.
    pub fn reassign_position(&mut self, position: i64, written_at: DateTime<Utc>) {
        self.position = position;
        self.record_write(written_at);
    }

    /// Marks the item soft-deleted and counts the write.
    pub fn soft_delete(&mut self, written_at: DateTime<Utc>) {
        self.deleted_at = Some(written_at);
        self.record_write(written_at);
    }

    /// Increments the version by exactly 1 and stamps the write time.
    fn record_write(&mut self, written_at: DateTime<Utc>) {
        self.version = self.version.next();
        self.updated_at = written_at;
    }
}
