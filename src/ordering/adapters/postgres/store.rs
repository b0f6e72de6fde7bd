//! `PostgreSQL` item store.
//!
//! Every mutation runs inside one transaction with the target row locked
//! `FOR UPDATE`, making the transaction the atomic unit of work: the guard is
//! re-applied against the locked row, and the rebalance batch commits with
//! the main change or not at all. Concurrent writes to different items never
//! block each other; only same-row writers queue on the row lock.

use super::{
    models::{ItemRow, NewItemRow},
    schema::items,
};
use crate::ordering::{
    domain::{
        ContainerId, Item, ItemId, PersistedItemData, PositionAssignment, SiblingEntry,
        SiblingSnapshot, TenantId, Version,
    },
    ports::{ItemChange, ItemStore, ItemStoreError, ItemStoreResult, ItemWrite},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use serde_json::{Map, Value};

/// `PostgreSQL` connection pool type used by item adapters.
pub type ItemPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed item store.
#[derive(Debug, Clone)]
pub struct PostgresItemStore {
    pool: ItemPgPool,
}

impl PostgresItemStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: ItemPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> ItemStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ItemStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(ItemStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(ItemStoreError::persistence)?
    }
}

impl From<DieselError> for ItemStoreError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl ItemStore for PostgresItemStore {
    async fn insert(
        &self,
        item: &Item,
        reassignments: &[PositionAssignment],
        written_at: DateTime<Utc>,
    ) -> ItemStoreResult<()> {
        let item_id = item.id();
        let tenant_id = item.tenant_id();
        let container_id = item.container_id();
        let position = item.position();
        let new_row = to_new_row(item);
        let batch = reassignments.to_vec();

        self.run_blocking(move |connection| {
            connection.transaction(|transaction| {
                diesel::insert_into(items::table)
                    .values(&new_row)
                    .execute(transaction)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                            if is_position_unique_violation(info.as_ref()) =>
                        {
                            ItemStoreError::PositionTaken {
                                container_id,
                                position,
                            }
                        }
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            ItemStoreError::DuplicateItem(item_id)
                        }
                        _ => ItemStoreError::persistence(err),
                    })?;
                apply_reassignments(transaction, tenant_id, &batch, written_at)?;
                verify_no_tie(transaction, tenant_id, container_id)
            })
        })
        .await
    }

    async fn find_item(&self, id: ItemId, tenant_id: TenantId) -> ItemStoreResult<Option<Item>> {
        self.run_blocking(move |connection| {
            let row = items::table
                .filter(
                    items::id
                        .eq(id.into_inner())
                        .and(items::tenant_id.eq(tenant_id.into_inner()))
                        .and(items::deleted_at.is_null()),
                )
                .select(ItemRow::as_select())
                .first::<ItemRow>(connection)
                .optional()?;
            row.map(row_to_item).transpose()
        })
        .await
    }

    async fn list_items(
        &self,
        container_id: ContainerId,
        tenant_id: TenantId,
    ) -> ItemStoreResult<Vec<Item>> {
        self.run_blocking(move |connection| {
            let rows = items::table
                .filter(
                    items::container_id
                        .eq(container_id.into_inner())
                        .and(items::tenant_id.eq(tenant_id.into_inner()))
                        .and(items::deleted_at.is_null()),
                )
                .order(items::position.asc())
                .select(ItemRow::as_select())
                .load::<ItemRow>(connection)?;
            rows.into_iter().map(row_to_item).collect()
        })
        .await
    }

    async fn load_siblings(
        &self,
        container_id: ContainerId,
        tenant_id: TenantId,
    ) -> ItemStoreResult<SiblingSnapshot> {
        self.run_blocking(move |connection| {
            let pairs = items::table
                .filter(
                    items::container_id
                        .eq(container_id.into_inner())
                        .and(items::tenant_id.eq(tenant_id.into_inner()))
                        .and(items::deleted_at.is_null()),
                )
                .order(items::position.asc())
                .select((items::id, items::position))
                .load::<(uuid::Uuid, i64)>(connection)?;
            let entries = pairs
                .into_iter()
                .map(|(id, position)| SiblingEntry {
                    id: ItemId::from_uuid(id),
                    position,
                })
                .collect();
            Ok(SiblingSnapshot::new(entries))
        })
        .await
    }

    async fn commit(&self, write: &ItemWrite) -> ItemStoreResult<Item> {
        let write = write.clone();

        self.run_blocking(move |connection| {
            connection.transaction(|transaction| {
                let row = items::table
                    .filter(
                        items::id
                            .eq(write.id.into_inner())
                            .and(items::tenant_id.eq(write.tenant_id.into_inner()))
                            .and(items::deleted_at.is_null()),
                    )
                    .select(ItemRow::as_select())
                    .for_update()
                    .first::<ItemRow>(transaction)
                    .optional()?
                    .ok_or(ItemStoreError::NotFound(write.id))?;
                let current = row_to_item(row)?;

                write.guard.check(current.version()).map_err(|mismatch| {
                    ItemStoreError::VersionConflict {
                        id: write.id,
                        expected: mismatch.expected,
                        current: mismatch.current,
                    }
                })?;

                let mut updated = current;
                match &write.change {
                    ItemChange::Fields(patch) => updated.patch_fields(patch, write.written_at),
                    ItemChange::Placement {
                        container_id,
                        position,
                    } => updated.relocate(*container_id, *position, write.written_at),
                    ItemChange::Delete => updated.soft_delete(write.written_at),
                }

                diesel::update(items::table.filter(items::id.eq(write.id.into_inner())))
                    .set((
                        items::container_id.eq(updated.container_id().into_inner()),
                        items::position.eq(updated.position()),
                        items::version.eq(updated.version().value()),
                        items::fields.eq(Value::Object(updated.fields().clone())),
                        items::updated_at.eq(updated.updated_at()),
                        items::deleted_at.eq(updated.deleted_at()),
                    ))
                    .execute(transaction)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                            if is_position_unique_violation(info.as_ref()) =>
                        {
                            ItemStoreError::PositionTaken {
                                container_id: updated.container_id(),
                                position: updated.position(),
                            }
                        }
                        _ => ItemStoreError::persistence(err),
                    })?;

                apply_reassignments(
                    transaction,
                    write.tenant_id,
                    &write.reassignments,
                    write.written_at,
                )?;
                if matches!(write.change, ItemChange::Placement { .. }) {
                    verify_no_tie(transaction, write.tenant_id, updated.container_id())?;
                }
                Ok(updated)
            })
        })
        .await
    }
}

/// Renumbers the rebalance batch inside the surrounding transaction. Each
/// touched row's version increments by exactly 1; a missing target aborts
/// the transaction.
fn apply_reassignments(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    reassignments: &[PositionAssignment],
    written_at: DateTime<Utc>,
) -> ItemStoreResult<()> {
    for assignment in reassignments {
        let affected = diesel::update(
            items::table.filter(
                items::id
                    .eq(assignment.id.into_inner())
                    .and(items::tenant_id.eq(tenant_id.into_inner()))
                    .and(items::deleted_at.is_null()),
            ),
        )
        .set((
            items::position.eq(assignment.position),
            items::version.eq(items::version + 1_i64),
            items::updated_at.eq(written_at),
        ))
        .execute(connection)?;

        if affected != 1 {
            return Err(ItemStoreError::persistence(std::io::Error::other(format!(
                "rebalance target {} is not visible to the tenant",
                assignment.id
            ))));
        }
    }
    Ok(())
}

/// Matches violations of the partial unique index on
/// `(tenant_id, container_id, position) WHERE deleted_at IS NULL`, the
/// database-level backstop for the no-tie invariant under concurrency.
fn is_position_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == "idx_items_container_position_unique")
}

/// Re-reads the container's positions inside the transaction and rejects the
/// write when any two non-deleted siblings tie.
fn verify_no_tie(
    connection: &mut PgConnection,
    tenant_id: TenantId,
    container_id: ContainerId,
) -> ItemStoreResult<()> {
    let positions = items::table
        .filter(
            items::container_id
                .eq(container_id.into_inner())
                .and(items::tenant_id.eq(tenant_id.into_inner()))
                .and(items::deleted_at.is_null()),
        )
        .order(items::position.asc())
        .select(items::position)
        .load::<i64>(connection)?;

    let tied = positions
        .iter()
        .zip(positions.iter().skip(1))
        .find(|(lower, upper)| lower == upper);
    if let Some((&position, _)) = tied {
        return Err(ItemStoreError::PositionTaken {
            container_id,
            position,
        });
    }
    Ok(())
}

fn to_new_row(item: &Item) -> NewItemRow {
    NewItemRow {
        id: item.id().into_inner(),
        tenant_id: item.tenant_id().into_inner(),
        container_id: item.container_id().into_inner(),
        position: item.position(),
        version: item.version().value(),
        fields: Value::Object(item.fields().clone()),
        created_at: item.created_at(),
        updated_at: item.updated_at(),
        deleted_at: item.deleted_at(),
    }
}

fn row_to_item(row: ItemRow) -> ItemStoreResult<Item> {
    let ItemRow {
        id,
        tenant_id,
        container_id,
        position,
        version: persisted_version,
        fields: persisted_fields,
        created_at,
        updated_at,
        deleted_at,
    } = row;

    let version = Version::new(persisted_version).map_err(ItemStoreError::persistence)?;
    let fields = serde_json::from_value::<Map<String, Value>>(persisted_fields)
        .map_err(ItemStoreError::persistence)?;

    Ok(Item::from_persisted(PersistedItemData {
        id: ItemId::from_uuid(id),
        tenant_id: TenantId::from_uuid(tenant_id),
        container_id: ContainerId::from_uuid(container_id),
        position,
        version,
        fields,
        created_at,
        updated_at,
        deleted_at,
    }))
}
