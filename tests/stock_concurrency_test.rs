mod common;

use stockledger_api::services::stock::ItemKey;

/// Spawns more concurrent unit decreases than the item has stock and asserts
/// that exactly enough succeed to exhaust it: the conditional update's
/// sufficiency filter is the only concurrency control in play.
#[tokio::test]
async fn concurrent_decreases_never_drive_quantity_negative() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "concurrency@test.dev").await;
    let item = common::create_item(&app, owner, "WIDGET-1", 10).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let stock = app.services.stock.clone();
        tasks.push(tokio::spawn(async move {
            stock
                .apply_delta(owner, ItemKey::Sku("WIDGET-1"), -1)
                .await
                .expect("mutator call")
                .is_some()
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        if task.await.expect("task join") {
            succeeded += 1;
        }
    }

    assert_eq!(
        succeeded, 10,
        "exactly 10 unit decreases should succeed; got {}",
        succeeded
    );

    let after = common::fetch_item(&app, owner, item.id).await;
    assert_eq!(after.quantity, 0);
}

/// Two concurrent batch sales that cannot both be satisfied: one wins, the
/// loser rolls back, and the item never goes negative.
#[tokio::test]
async fn concurrent_batches_cannot_oversell() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "batches@test.dev").await;
    let item = common::create_item(&app, owner, "GADGET-1", 8).await;

    let stock_a = app.services.stock.clone();
    let stock_b = app.services.stock.clone();
    let sale = |stock: std::sync::Arc<stockledger_api::services::stock::StockService>| async move {
        stock
            .record_sale(
                owner,
                vec![stockledger_api::services::stock::SaleLine {
                    sku: "GADGET-1".to_string(),
                    quantity: 6,
                }],
                None,
            )
            .await
    };

    let (first, second) = tokio::join!(sale(stock_a), sale(stock_b));
    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "only one of the two 6-unit sales can fit in 8");

    let after = common::fetch_item(&app, owner, item.id).await;
    assert_eq!(after.quantity, 2);
    assert!(after.quantity >= 0);
}
