mod common;

use stockledger_api::errors::ServiceError;

/// Type inference for untyped adjustments: a positive delta is recorded as a
/// purchase, a negative one as an adjustment.
#[tokio::test]
async fn untyped_adjustment_infers_type_from_delta_sign() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "adjust-infer@test.dev").await;
    let item = common::create_item(&app, owner, "SIGMA", 5).await;

    let (item_row, movement) = app
        .services
        .stock
        .adjust_quantity(owner, item.id, 10, "restock".to_string(), None)
        .await
        .expect("positive adjustment");
    assert_eq!(movement.movement_type, "purchase");
    assert_eq!(movement.delta, 10);
    assert_eq!(item_row.quantity, 15);

    let (item_row, movement) = app
        .services
        .stock
        .adjust_quantity(owner, item.id, -3, "damaged units".to_string(), None)
        .await
        .expect("negative adjustment");
    assert_eq!(movement.movement_type, "adjustment");
    assert_eq!(movement.delta, -3);
    assert_eq!(item_row.quantity, 12);
}

/// A recognized explicit type wins; an unrecognized one falls back to
/// `adjustment` regardless of sign.
#[tokio::test]
async fn explicit_type_is_respected_and_unknown_types_fall_back() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "adjust-explicit@test.dev").await;
    let item = common::create_item(&app, owner, "SIGMA", 5).await;

    let (_item, movement) = app
        .services
        .stock
        .adjust_quantity(owner, item.id, 4, "manual count".to_string(), Some("adjustment"))
        .await
        .expect("explicit adjustment");
    assert_eq!(movement.movement_type, "adjustment");

    let (_item, movement) = app
        .services
        .stock
        .adjust_quantity(owner, item.id, 4, "restock".to_string(), Some("replenishment"))
        .await
        .expect("unknown type");
    assert_eq!(movement.movement_type, "adjustment");
}

/// Every successful adjustment pairs the quantity change with exactly one
/// movement whose delta equals the applied change.
#[tokio::test]
async fn adjustment_pairs_quantity_change_with_one_movement() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "adjust-pair@test.dev").await;
    let item = common::create_item(&app, owner, "SIGMA", 8).await;

    let before = common::fetch_item(&app, owner, item.id).await.quantity;
    let (item_row, movement) = app
        .services
        .stock
        .adjust_quantity(owner, item.id, -2, "shrinkage".to_string(), None)
        .await
        .expect("adjustment");

    assert_eq!(item_row.quantity, before - 2);
    let matching: Vec<_> = common::movements_for_item(&app, item.id)
        .await
        .into_iter()
        .filter(|m| m.id == movement.id)
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].delta, -2);
}

/// Zero deltas are rejected, and a decrease past the available stock is the
/// not-applied outcome, leaving the item untouched.
#[tokio::test]
async fn invalid_adjustments_do_not_mutate() {
    let app = common::spawn_app().await;
    let owner = common::register_owner(&app, "adjust-invalid@test.dev").await;
    let item = common::create_item(&app, owner, "SIGMA", 3).await;

    let err = app
        .services
        .stock
        .adjust_quantity(owner, item.id, 0, "noop".to_string(), None)
        .await
        .expect_err("zero delta");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = app
        .services
        .stock
        .adjust_quantity(owner, item.id, -5, "too much".to_string(), None)
        .await
        .expect_err("insufficient stock");
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    assert_eq!(common::fetch_item(&app, owner, item.id).await.quantity, 3);
    assert_eq!(common::movements_for_item(&app, item.id).await.len(), 1);
}
