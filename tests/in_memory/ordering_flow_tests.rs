//! Lifecycle and placement flows through the public service API.

use super::helpers::{assert_no_ties, context, create_item_at, expect_current};
use rstest::rstest;
use serde_json::json;
use tessera::ordering::{
    domain::{ContainerId, FieldPatch, Item, PlacementTarget, TenantId},
    services::{DeleteItemRequest, MoveItemRequest, ReorderItemRequest, UpdateItemRequest},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn full_item_lifecycle_tracks_every_write() -> Result<(), eyre::Report> {
    let context = context();
    let tenant_id = TenantId::new();
    let source = ContainerId::new();
    let destination = ContainerId::new();

    let created = create_item_at(&context, tenant_id, source, PlacementTarget::End).await;
    eyre::ensure!(created.version().value() == 1, "create should start at 1");

    let updated = context
        .service
        .update_item(UpdateItemRequest::new(
            created.id(),
            tenant_id,
            expect_current(&created),
            FieldPatch::new().with_entry("title", json!("Triage intake queue")),
        ))
        .await
        .expect("update should succeed");
    eyre::ensure!(updated.version().value() == 2, "update should count once");

    let reordered = context
        .service
        .reorder_item(ReorderItemRequest::new(
            created.id(),
            tenant_id,
            expect_current(&updated),
            PlacementTarget::Start,
        ))
        .await
        .expect("reorder should succeed");
    eyre::ensure!(reordered.version().value() == 3, "reorder should count once");

    let moved = context
        .service
        .move_item(MoveItemRequest::new(
            created.id(),
            tenant_id,
            expect_current(&reordered),
            destination,
        ))
        .await
        .expect("move should succeed");
    eyre::ensure!(moved.version().value() == 4, "move should count once");
    eyre::ensure!(
        moved.container_id() == destination,
        "move should change the container"
    );

    let deleted = context
        .service
        .delete_item(DeleteItemRequest::new(
            created.id(),
            tenant_id,
            expect_current(&moved),
        ))
        .await
        .expect("delete should succeed");
    eyre::ensure!(deleted.version().value() == 5, "delete should count once");
    eyre::ensure!(deleted.is_deleted(), "delete should mark the item");

    eyre::ensure!(
        context.audit.records().len() == 5,
        "every successful mutation should be audited"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn placement_targets_compose_into_a_stable_listing() -> Result<(), eyre::Report> {
    let context = context();
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();

    let first = create_item_at(&context, tenant_id, container_id, PlacementTarget::End).await;
    let second = create_item_at(&context, tenant_id, container_id, PlacementTarget::End).await;
    let front = create_item_at(&context, tenant_id, container_id, PlacementTarget::Start).await;
    let wedged = create_item_at(
        &context,
        tenant_id,
        container_id,
        PlacementTarget::After { anchor: first.id() },
    )
    .await;
    let leading = create_item_at(
        &context,
        tenant_id,
        container_id,
        PlacementTarget::Before { anchor: second.id() },
    )
    .await;

    let listed = context
        .service
        .list_items(container_id, tenant_id)
        .await
        .expect("listing should succeed");

    let ordered: Vec<_> = listed.iter().map(Item::id).collect();
    assert_eq!(
        ordered,
        vec![
            front.id(),
            first.id(),
            wedged.id(),
            leading.id(),
            second.id()
        ]
    );
    assert_no_ties(&listed)?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn midpoint_insertion_writes_only_the_new_item() {
    let context = context();
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();
    for _ in 0..3 {
        create_item_at(&context, tenant_id, container_id, PlacementTarget::End).await;
    }

    let listed_before = context
        .service
        .list_items(container_id, tenant_id)
        .await
        .expect("listing should succeed");
    let middle = listed_before.get(1).expect("middle sibling");

    let inserted = create_item_at(
        &context,
        tenant_id,
        container_id,
        PlacementTarget::After { anchor: middle.id() },
    )
    .await;
    assert_eq!(inserted.position(), 2560);

    let listed_after = context
        .service
        .list_items(container_id, tenant_id)
        .await
        .expect("listing should succeed");
    for before in &listed_before {
        let after = listed_after
            .iter()
            .find(|item| item.id() == before.id())
            .expect("pre-existing sibling should survive");
        assert_eq!(after.position(), before.position());
        assert_eq!(after.version(), before.version());
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moving_between_containers_preserves_both_sides() -> Result<(), eyre::Report> {
    let context = context();
    let tenant_id = TenantId::new();
    let source = ContainerId::new();
    let destination = ContainerId::new();

    let moved = create_item_at(&context, tenant_id, source, PlacementTarget::End).await;
    let stays = create_item_at(&context, tenant_id, source, PlacementTarget::End).await;
    create_item_at(&context, tenant_id, destination, PlacementTarget::End).await;
    create_item_at(&context, tenant_id, destination, PlacementTarget::End).await;

    let relocated = context
        .service
        .move_item(MoveItemRequest::new(
            moved.id(),
            tenant_id,
            expect_current(&moved),
            destination,
        ))
        .await
        .expect("move should succeed");
    eyre::ensure!(
        relocated.position() == 3072,
        "move should append after the destination's last sibling"
    );

    let source_items = context
        .service
        .list_items(source, tenant_id)
        .await
        .expect("source listing should succeed");
    eyre::ensure!(source_items.len() == 1, "source should keep one item");
    let survivor = source_items.first().expect("source survivor");
    eyre::ensure!(survivor.id() == stays.id(), "survivor should be untouched");
    eyre::ensure!(
        survivor.position() == stays.position() && survivor.version() == stays.version(),
        "survivor position and version should be unchanged"
    );

    let destination_items = context
        .service
        .list_items(destination, tenant_id)
        .await
        .expect("destination listing should succeed");
    eyre::ensure!(destination_items.len() == 3, "destination should gain one");
    assert_no_ties(&destination_items)?;
    Ok(())
}
