mod common;

use stockledger_api::errors::ServiceError;
use stockledger_api::services::stock::{ReturnLine, SaleLine};

fn sale_line(sku: &str, quantity: i32) -> SaleLine {
    SaleLine {
        sku: sku.to_string(),
        quantity,
    }
}

/// A failing middle line aborts the batch: earlier lines are compensated back
/// to their pre-batch quantities, their movements are deleted, and the error
/// names the offending SKU.
#[tokio::test]
async fn failed_sale_line_rolls_back_applied_lines() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "rollback@test.dev").await;
    let alpha = common::create_item(&app, owner, "ALPHA", 10).await;
    let beta = common::create_item(&app, owner, "BETA", 2).await;

    let err = app
        .services
        .stock
        .record_sale(
            owner,
            vec![sale_line("ALPHA", 3), sale_line("BETA", 5)],
            Some("Ada".to_string()),
        )
        .await
        .expect_err("BETA line must fail");

    match &err {
        ServiceError::InsufficientStock(msg) => {
            assert!(msg.contains("BETA"), "error should name the SKU: {}", msg)
        }
        other => panic!("unexpected error variant: {:?}", other),
    }

    // Pre-batch quantities restored.
    assert_eq!(common::fetch_item(&app, owner, alpha.id).await.quantity, 10);
    assert_eq!(common::fetch_item(&app, owner, beta.id).await.quantity, 2);

    // No sale movements survive the rollback; only the initial rows remain.
    for item in [&alpha, &beta] {
        let movements = common::movements_for_item(&app, item.id).await;
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, "initial");
    }
}

/// An unknown SKU fails a sale the same way as insufficient stock.
#[tokio::test]
async fn unknown_sku_aborts_sale() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "unknown-sku@test.dev").await;
    let alpha = common::create_item(&app, owner, "ALPHA", 10).await;

    let err = app
        .services
        .stock
        .record_sale(
            owner,
            vec![sale_line("ALPHA", 1), sale_line("GHOST", 1)],
            None,
        )
        .await
        .expect_err("GHOST line must fail");
    assert!(err.to_string().contains("GHOST"));

    assert_eq!(common::fetch_item(&app, owner, alpha.id).await.quantity, 10);
}

/// Lines are applied strictly in order, so a repeated SKU sees the effect of
/// its earlier line; when the second occurrence no longer fits, the whole
/// batch unwinds.
#[tokio::test]
async fn repeated_sku_lines_observe_each_other() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "repeat-sku@test.dev").await;
    let item = common::create_item(&app, owner, "DELTA", 10).await;

    let err = app
        .services
        .stock
        .record_sale(
            owner,
            vec![sale_line("DELTA", 6), sale_line("DELTA", 6)],
            None,
        )
        .await
        .expect_err("second DELTA line cannot fit");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    assert_eq!(common::fetch_item(&app, owner, item.id).await.quantity, 10);
    assert_eq!(common::movements_for_item(&app, item.id).await.len(), 1);
}

/// A fully applied sale records one movement per line, each carrying the
/// applied delta and the customer.
#[tokio::test]
async fn successful_sale_records_one_movement_per_line() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "sale-ok@test.dev").await;
    let alpha = common::create_item(&app, owner, "ALPHA", 10).await;
    let beta = common::create_item(&app, owner, "BETA", 7).await;

    let outcome = app
        .services
        .stock
        .record_sale(
            owner,
            vec![sale_line("ALPHA", 3), sale_line("BETA", 2)],
            Some("Grace".to_string()),
        )
        .await
        .expect("sale should apply");
    assert_eq!(outcome.lines_applied, 2);

    assert_eq!(common::fetch_item(&app, owner, alpha.id).await.quantity, 7);
    assert_eq!(common::fetch_item(&app, owner, beta.id).await.quantity, 5);

    let movements = common::movements_for_item(&app, alpha.id).await;
    let sales: Vec<_> = movements
        .iter()
        .filter(|m| m.movement_type == "sale")
        .collect();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].delta, -3);
    assert_eq!(sales[0].customer_name.as_deref(), Some("Grace"));
}

/// Returns are the increasing twin: a missing SKU unwinds the batch, and a
/// successful batch adds stock with `return` movements.
#[tokio::test]
async fn returns_roll_back_and_apply_like_sales() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "returns@test.dev").await;
    let alpha = common::create_item(&app, owner, "ALPHA", 5).await;

    let err = app
        .services
        .stock
        .record_return(
            owner,
            vec![
                ReturnLine {
                    sku: "ALPHA".to_string(),
                    quantity: 2,
                    reason: Some("damaged box".to_string()),
                },
                ReturnLine {
                    sku: "GHOST".to_string(),
                    quantity: 1,
                    reason: None,
                },
            ],
        )
        .await
        .expect_err("GHOST line must fail");
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(common::fetch_item(&app, owner, alpha.id).await.quantity, 5);

    let outcome = app
        .services
        .stock
        .record_return(
            owner,
            vec![ReturnLine {
                sku: "ALPHA".to_string(),
                quantity: 3,
                reason: Some("unused".to_string()),
            }],
        )
        .await
        .expect("return should apply");
    assert_eq!(outcome.lines_applied, 1);
    assert_eq!(common::fetch_item(&app, owner, alpha.id).await.quantity, 8);

    let movements = common::movements_for_item(&app, alpha.id).await;
    let returns: Vec<_> = movements
        .iter()
        .filter(|m| m.movement_type == "return")
        .collect();
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].delta, 3);
    assert_eq!(returns[0].reason.as_deref(), Some("unused"));
}

/// Empty batches and non-positive quantities are rejected before anything is
/// applied.
#[tokio::test]
async fn invalid_batches_are_rejected_upfront() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "invalid-batch@test.dev").await;
    let item = common::create_item(&app, owner, "ALPHA", 4).await;

    let err = app
        .services
        .stock
        .record_sale(owner, vec![], None)
        .await
        .expect_err("empty batch");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = app
        .services
        .stock
        .record_sale(owner, vec![sale_line("ALPHA", 0)], None)
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    assert_eq!(common::fetch_item(&app, owner, item.id).await.quantity, 4);
    assert_eq!(common::movements_for_item(&app, item.id).await.len(), 1);
}
