mod common;

use assert_matches::assert_matches;
use sea_orm::{ActiveModelTrait, ModelTrait, Set};
use std::time::Duration;
use stockledger_api::{
    entities::{stock_transaction, stock_transaction::MovementType},
    errors::ServiceError,
    events::ChangeScope,
    services::{catalog::UpdateItemInput, movements::RecordMovementInput},
};

fn movement(item_id: uuid::Uuid, movement_type: MovementType, quantity: i32) -> RecordMovementInput {
    RecordMovementInput {
        item_id,
        movement_type,
        quantity,
        actor: "Test Actor".to_string(),
        notes: None,
    }
}

/// The end-to-end scenario: create, stock in, stock out to the threshold,
/// then overdraw and get rejected without a state change.
#[tokio::test]
async fn gold_bar_scenario() {
    let app = common::setup().await;
    let item = common::create_item(&app, "Gold Bar", "Pcs", 10).await;
    assert_eq!(item.quantity, 0);
    assert!(item.sku.starts_with("SKU-"));

    app.services
        .movements
        .record_movement(app.owner, movement(item.id, MovementType::In, 50))
        .await
        .expect("stock in");

    let item_after_in = app
        .services
        .catalog
        .get_item(app.owner, item.id)
        .await
        .unwrap();
    assert_eq!(item_after_in.quantity, 50);
    assert!(!item_after_in.is_low_stock());

    app.services
        .movements
        .record_movement(app.owner, movement(item.id, MovementType::Out, 45))
        .await
        .expect("stock out");

    let item_after_out = app
        .services
        .catalog
        .get_item(app.owner, item.id)
        .await
        .unwrap();
    assert_eq!(item_after_out.quantity, 5);
    assert!(item_after_out.is_low_stock());

    let low = app.services.reports.low_stock(app.owner).await.unwrap();
    assert!(low.iter().any(|i| i.id == item.id));

    // Overdraw: rejected, reporting the current quantity, and nothing moves.
    let err = app
        .services
        .movements
        .record_movement(app.owner, movement(item.id, MovementType::Out, 10))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            available: 5,
            requested: 10
        }
    );

    let item_unchanged = app
        .services
        .catalog
        .get_item(app.owner, item.id)
        .await
        .unwrap();
    assert_eq!(item_unchanged.quantity, 5);

    let (history, total) = app
        .services
        .movements
        .list_movements(app.owner, 1, 50)
        .await
        .unwrap();
    assert_eq!(total, 2, "the rejected movement must not reach the ledger");
    assert_eq!(history.len(), 2);
}

/// For every item, at all times: quantity equals the signed sum of its
/// ledger rows.
#[tokio::test]
async fn quantity_always_matches_the_ledger() {
    let app = common::setup().await;
    let item = common::create_item(&app, "Widget", "Box", 2).await;

    let moves = [
        (MovementType::In, 30),
        (MovementType::Out, 5),
        (MovementType::In, 12),
        (MovementType::Out, 17),
    ];
    for (mt, q) in moves {
        app.services
            .movements
            .record_movement(app.owner, movement(item.id, mt, q))
            .await
            .expect("movement");
    }

    let current = app
        .services
        .catalog
        .get_item(app.owner, item.id)
        .await
        .unwrap()
        .quantity;

    let ledger = app.services.movements.snapshot(app.owner).await.unwrap();
    let ledger_sum: i32 = ledger.iter().map(|tx| tx.signed_quantity()).sum();

    assert_eq!(current, 20);
    assert_eq!(current, ledger_sum);
    assert!(current >= 0);
}

/// Repeating an oversized stock-out never mutates anything and always
/// returns the same typed rejection.
#[tokio::test]
async fn oversized_stock_out_rejection_is_idempotent() {
    let app = common::setup().await;
    let item = common::create_item(&app, "Cable", "Roll", 0).await;

    app.services
        .movements
        .record_movement(app.owner, movement(item.id, MovementType::In, 3))
        .await
        .unwrap();

    for _ in 0..5 {
        let err = app
            .services
            .movements
            .record_movement(app.owner, movement(item.id, MovementType::Out, 4))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            ServiceError::InsufficientStock {
                available: 3,
                requested: 4
            }
        );
    }

    let quantity = app
        .services
        .catalog
        .get_item(app.owner, item.id)
        .await
        .unwrap()
        .quantity;
    assert_eq!(quantity, 3);
}

/// Ledger rows are append-only: the entity layer rejects updates and
/// deletes even when reached directly, below the service surface.
#[tokio::test]
async fn ledger_rows_cannot_be_edited_or_deleted() {
    let app = common::setup().await;
    let item = common::create_item(&app, "Tape", "Pcs", 0).await;

    let row = app
        .services
        .movements
        .record_movement(app.owner, movement(item.id, MovementType::In, 7))
        .await
        .unwrap();

    let mut tampered: stock_transaction::ActiveModel = row.clone().into();
    tampered.quantity = Set(700);
    assert!(tampered.update(app.db.as_ref()).await.is_err());

    assert!(row.clone().delete(app.db.as_ref()).await.is_err());

    let ledger = app.services.movements.snapshot(app.owner).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].quantity, 7);
}

/// Renaming or deleting an item never rewrites history: ledger rows keep
/// the identity snapshot taken at movement time.
#[tokio::test]
async fn ledger_keeps_denormalized_identity_across_rename_and_delete() {
    let app = common::setup().await;
    let item = common::create_item(&app, "Old Name", "Pcs", 0).await;

    app.services
        .movements
        .record_movement(app.owner, movement(item.id, MovementType::In, 5))
        .await
        .unwrap();

    app.services
        .catalog
        .update_item(
            app.owner,
            item.id,
            UpdateItemInput {
                name: Some("New Name".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let ledger = app.services.movements.snapshot(app.owner).await.unwrap();
    assert_eq!(ledger[0].item_name, "Old Name");

    app.services
        .catalog
        .delete_item(app.owner, item.id)
        .await
        .unwrap();

    // History survives the delete, still under the original name.
    let ledger = app.services.movements.snapshot(app.owner).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].item_name, "Old Name");
    assert_eq!(ledger[0].item_id, item.id);
}

/// A committed movement pushes change notices for both the catalog and the
/// ledger, so snapshot consumers know to re-derive.
#[tokio::test]
async fn movements_notify_subscribers() {
    let app = common::setup().await;
    let item = common::create_item(&app, "Notify Me", "Pcs", 0).await;
    let mut sub = app.feed.subscribe();

    app.services
        .movements
        .record_movement(app.owner, movement(item.id, MovementType::In, 1))
        .await
        .unwrap();

    let mut scopes = Vec::new();
    for _ in 0..2 {
        let notice = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .expect("notice within timeout")
            .expect("feed open");
        assert_eq!(notice.owner_id, app.owner);
        scopes.push(notice.scope);
    }
    assert!(scopes.contains(&ChangeScope::Catalog));
    assert!(scopes.contains(&ChangeScope::Ledger));
}

/// Movements against a missing item fail with NotFound and leave no trace.
#[tokio::test]
async fn movement_against_missing_item_is_not_found() {
    let app = common::setup().await;

    let err = app
        .services
        .movements
        .record_movement(
            app.owner,
            movement(uuid::Uuid::new_v4(), MovementType::In, 1),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let ledger = app.services.movements.snapshot(app.owner).await.unwrap();
    assert!(ledger.is_empty());
}

/// Owners are isolated namespaces: one user's movements cannot touch
/// another user's item.
#[tokio::test]
async fn owners_cannot_move_each_others_stock() {
    let app = common::setup().await;
    let item = common::create_item(&app, "Private", "Pcs", 0).await;

    let stranger = uuid::Uuid::new_v4();
    let err = app
        .services
        .movements
        .record_movement(stranger, movement(item.id, MovementType::In, 1))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
