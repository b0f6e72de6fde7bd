//! Rebalance behaviour under gap exhaustion and displacement.

use super::helpers::{assert_no_ties, context, create_item_at, expect_current};
use rstest::rstest;
use tessera::ordering::{
    domain::{ContainerId, Item, PlacementTarget, TenantId},
    services::ReorderItemRequest,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn exhausted_midpoints_renumber_the_whole_container() -> Result<(), eyre::Report> {
    let context = context();
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();
    let first = create_item_at(
        &context,
        tenant_id,
        container_id,
        PlacementTarget::Absolute {
            position: 1024,
            displace: false,
        },
    )
    .await;
    let second = create_item_at(
        &context,
        tenant_id,
        container_id,
        PlacementTarget::Absolute {
            position: 1025,
            displace: false,
        },
    )
    .await;

    let inserted = create_item_at(
        &context,
        tenant_id,
        container_id,
        PlacementTarget::After { anchor: first.id() },
    )
    .await;

    let listed = context
        .service
        .list_items(container_id, tenant_id)
        .await
        .expect("listing should succeed");
    let positions: Vec<i64> = listed.iter().map(Item::position).collect();
    let ordered: Vec<_> = listed.iter().map(Item::id).collect();

    assert_eq!(positions, vec![0, 1024, 2048]);
    assert_eq!(ordered, vec![first.id(), inserted.id(), second.id()]);
    assert_no_ties(&listed)?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn every_renumbered_sibling_counts_the_batch_exactly_once() {
    let context = context();
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();
    let first = create_item_at(
        &context,
        tenant_id,
        container_id,
        PlacementTarget::Absolute {
            position: 100,
            displace: false,
        },
    )
    .await;
    let second = create_item_at(
        &context,
        tenant_id,
        container_id,
        PlacementTarget::Absolute {
            position: 101,
            displace: false,
        },
    )
    .await;
    create_item_at(
        &context,
        tenant_id,
        container_id,
        PlacementTarget::After { anchor: first.id() },
    )
    .await;

    for renumbered in [first.id(), second.id()] {
        let current = context
            .service
            .get_item(renumbered, tenant_id)
            .await
            .expect("sibling lookup should succeed");
        assert_eq!(current.version().value(), 2);
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_front_insertions_stay_ordered_and_tie_free() -> Result<(), eyre::Report> {
    let context = context();
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();

    let mut newest_first = Vec::new();
    for _ in 0..6 {
        let item =
            create_item_at(&context, tenant_id, container_id, PlacementTarget::Start).await;
        newest_first.insert(0, item.id());
    }

    let listed = context
        .service
        .list_items(container_id, tenant_id)
        .await
        .expect("listing should succeed");
    let ordered: Vec<_> = listed.iter().map(Item::id).collect();

    assert_eq!(ordered, newest_first);
    eyre::ensure!(
        listed.iter().all(|item| item.position() >= 0),
        "positions should never fall below the floor"
    );
    assert_no_ties(&listed)?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn displacement_moves_the_holder_and_its_followers_back() -> Result<(), eyre::Report> {
    let context = context();
    let tenant_id = TenantId::new();
    let container_id = ContainerId::new();
    let first = create_item_at(&context, tenant_id, container_id, PlacementTarget::End).await;
    let second = create_item_at(&context, tenant_id, container_id, PlacementTarget::End).await;
    let third = create_item_at(&context, tenant_id, container_id, PlacementTarget::End).await;

    let reordered = context
        .service
        .reorder_item(ReorderItemRequest::new(
            third.id(),
            tenant_id,
            expect_current(&third),
            PlacementTarget::Absolute {
                position: second.position(),
                displace: true,
            },
        ))
        .await
        .expect("displacing reorder should succeed");

    let listed = context
        .service
        .list_items(container_id, tenant_id)
        .await
        .expect("listing should succeed");
    let ordered: Vec<_> = listed.iter().map(Item::id).collect();

    assert_eq!(ordered, vec![first.id(), reordered.id(), second.id()]);
    assert_no_ties(&listed)?;
    Ok(())
}
