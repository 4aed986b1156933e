mod common;

use stockledger_api::errors::ServiceError;
use stockledger_api::services::stock::{ReturnLine, SaleLine};

async fn seed_history(app: &common::TestApp, owner: uuid::Uuid) -> uuid::Uuid {
    // 20 initial, -5 sale, +2 return, -4 adjustment => quantity 13.
    let item = common::create_item(app, owner, "TRACE", 20).await;
    app.services
        .stock
        .record_sale(
            owner,
            vec![SaleLine {
                sku: "TRACE".to_string(),
                quantity: 5,
            }],
            None,
        )
        .await
        .expect("sale");
    app.services
        .stock
        .record_return(
            owner,
            vec![ReturnLine {
                sku: "TRACE".to_string(),
                quantity: 2,
                reason: None,
            }],
        )
        .await
        .expect("return");
    app.services
        .stock
        .adjust_quantity(owner, item.id, -4, "shrinkage".to_string(), None)
        .await
        .expect("adjustment");
    item.id
}

/// Over the full unpaged history, each row's quantity-after equals the live
/// quantity minus the deltas of everything newer, and the continuation equals
/// the quantity before the earliest movement.
#[tokio::test]
async fn full_history_projection_matches_the_ledger() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "balance-full@test.dev").await;
    let item_id = seed_history(&app, owner).await;

    let live_quantity = common::fetch_item(&app, owner, item_id).await.quantity;
    assert_eq!(live_quantity, 13);

    let page = app
        .services
        .history
        .list_for_item(owner, item_id, 1, 50, None)
        .await
        .expect("history");

    assert_eq!(page.total, 4);
    assert_eq!(page.movements.len(), 4);

    // Newest-first: quantity_after[i] == live - sum(deltas[0..i]).
    let mut expected = live_quantity;
    for row in &page.movements {
        assert_eq!(row.quantity_after, expected);
        expected -= row.movement.delta;
    }
    // The item held nothing before its initial movement.
    assert_eq!(page.continuation_quantity, 0);
}

/// Paging with the continuation anchor reproduces exactly the unpaged
/// projection; the second page must not be requested without it.
#[tokio::test]
async fn paged_projection_chains_through_continuation_quantity() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "balance-paged@test.dev").await;
    let item_id = seed_history(&app, owner).await;

    let full = app
        .services
        .history
        .list_for_item(owner, item_id, 1, 50, None)
        .await
        .expect("full history");

    let first = app
        .services
        .history
        .list_for_item(owner, item_id, 1, 2, None)
        .await
        .expect("page 1");
    assert_eq!(first.movements.len(), 2);

    let second = app
        .services
        .history
        .list_for_item(owner, item_id, 2, 2, Some(first.continuation_quantity))
        .await
        .expect("page 2");
    assert_eq!(second.movements.len(), 2);

    let chained: Vec<i32> = first
        .movements
        .iter()
        .chain(second.movements.iter())
        .map(|row| row.quantity_after)
        .collect();
    let expected: Vec<i32> = full.movements.iter().map(|row| row.quantity_after).collect();
    assert_eq!(chained, expected);
    assert_eq!(second.continuation_quantity, full.continuation_quantity);

    let err = app
        .services
        .history
        .list_for_item(owner, item_id, 2, 2, None)
        .await
        .expect_err("anchor required beyond page 1");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

/// History is owner-scoped like everything else.
#[tokio::test]
async fn history_is_invisible_to_other_owners() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "balance-owner@test.dev").await;
    let intruder = common::register_owner(&app, "balance-intruder@test.dev").await;
    let item_id = seed_history(&app, owner).await;

    let err = app
        .services
        .history
        .list_for_item(intruder, item_id, 1, 10, None)
        .await
        .expect_err("foreign item");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
