//! Ordering operations against a real `PostgreSQL` database.

use super::helpers;
use rstest::rstest;
use serde_json::json;
use tessera::ordering::{
    domain::{ContainerId, FieldPatch, Item, PlacementTarget, TenantId, VersionGuard},
    services::{
        CreateItemRequest, DeleteItemRequest, MoveItemRequest, OrderingError, UpdateItemRequest,
    },
};

async fn create_at(
    service: &helpers::PgService,
    tenant_id: TenantId,
    container_id: ContainerId,
    target: PlacementTarget,
) -> Item {
    service
        .create_item(CreateItemRequest::new(tenant_id, container_id).with_target(target))
        .await
        .expect("item creation should succeed")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn created_items_list_in_position_order() {
    let Some(pool) = helpers::test_pool() else {
        return;
    };
    let service = helpers::service(pool);
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();

    let first = create_at(&service, tenant_id, container_id, PlacementTarget::End).await;
    let second = create_at(&service, tenant_id, container_id, PlacementTarget::End).await;
    let front = create_at(&service, tenant_id, container_id, PlacementTarget::Start).await;

    let listed = service
        .list_items(container_id, tenant_id)
        .await
        .expect("listing should succeed");
    let ordered: Vec<_> = listed.iter().map(Item::id).collect();
    assert_eq!(ordered, vec![front.id(), first.id(), second.id()]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn updates_persist_the_patch_and_guard_the_version() {
    let Some(pool) = helpers::test_pool() else {
        return;
    };
    let service = helpers::service(pool);
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();
    let item = create_at(&service, tenant_id, container_id, PlacementTarget::End).await;

    let updated = service
        .update_item(UpdateItemRequest::new(
            item.id(),
            tenant_id,
            VersionGuard::Expect(item.version()),
            FieldPatch::new().with_entry("title", json!("Persisted title")),
        ))
        .await
        .expect("update should succeed");
    assert_eq!(updated.version().value(), 2);

    let stale = service
        .update_item(UpdateItemRequest::new(
            item.id(),
            tenant_id,
            VersionGuard::Expect(item.version()),
            FieldPatch::new().with_entry("title", json!("Stale write")),
        ))
        .await;
    assert!(matches!(stale, Err(OrderingError::VersionConflict { .. })));

    let current = service
        .get_item(item.id(), tenant_id)
        .await
        .expect("lookup should succeed");
    assert_eq!(current.fields().get("title"), Some(&json!("Persisted title")));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moves_relocate_across_containers_atomically() {
    let Some(pool) = helpers::test_pool() else {
        return;
    };
    let service = helpers::service(pool);
    let tenant_id = TenantId::new();
    let source = ContainerId::new();
    let destination = ContainerId::new();
    let moved = create_at(&service, tenant_id, source, PlacementTarget::End).await;
    let stays = create_at(&service, tenant_id, source, PlacementTarget::End).await;
    create_at(&service, tenant_id, destination, PlacementTarget::End).await;

    let relocated = service
        .move_item(MoveItemRequest::new(
            moved.id(),
            tenant_id,
            VersionGuard::Expect(moved.version()),
            destination,
        ))
        .await
        .expect("move should succeed");

    assert_eq!(relocated.container_id(), destination);
    assert_eq!(relocated.position(), 2048);

    let survivor = service
        .get_item(stays.id(), tenant_id)
        .await
        .expect("source sibling lookup should succeed");
    assert_eq!(survivor.position(), stays.position());
    assert_eq!(survivor.version(), stays.version());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn gap_exhaustion_renumbers_the_container_in_one_batch() {
    let Some(pool) = helpers::test_pool() else {
        return;
    };
    let service = helpers::service(pool);
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();
    let first = create_at(
        &service,
        tenant_id,
        container_id,
        PlacementTarget::Absolute {
            position: 1024,
            displace: false,
        },
    )
    .await;
    create_at(
        &service,
        tenant_id,
        container_id,
        PlacementTarget::Absolute {
            position: 1025,
            displace: false,
        },
    )
    .await;

    create_at(
        &service,
        tenant_id,
        container_id,
        PlacementTarget::After { anchor: first.id() },
    )
    .await;

    let listed = service
        .list_items(container_id, tenant_id)
        .await
        .expect("listing should succeed");
    let positions: Vec<i64> = listed.iter().map(Item::position).collect();
    assert_eq!(positions, vec![0, 1024, 2048]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn soft_deleted_items_stay_invisible_to_every_read() {
    let Some(pool) = helpers::test_pool() else {
        return;
    };
    let service = helpers::service(pool);
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();
    let deleted = create_at(&service, tenant_id, container_id, PlacementTarget::End).await;
    let survivor = create_at(&service, tenant_id, container_id, PlacementTarget::End).await;

    service
        .delete_item(DeleteItemRequest::new(
            deleted.id(),
            tenant_id,
            VersionGuard::Expect(deleted.version()),
        ))
        .await
        .expect("delete should succeed");

    let lookup = service.get_item(deleted.id(), tenant_id).await;
    assert!(matches!(lookup, Err(OrderingError::NotFound(_))));

    let listed = service
        .list_items(container_id, tenant_id)
        .await
        .expect("listing should succeed");
    let ordered: Vec<_> = listed.iter().map(Item::id).collect();
    assert_eq!(ordered, vec![survivor.id()]);
}
