mod common;

use chrono::{Duration, Utc};

use storeroom_api::services::issuance::NewIssuance;
use storeroom_api::services::stock_in::NewStockIn;
use storeroom_api::services::StockLine;

/// Conservation: quantity always equals stocked-in minus active issued,
/// where "active" excludes reversed issuances, at every observation point.
#[tokio::test]
async fn quantity_conserves_across_engines() {
    let state = common::setup_state().await;
    let keeper = common::seed_user(&state, "storekeeper", "Store Keeper").await;
    let staff = common::seed_staff(&state, "OPS001", "Jane Poe", None).await;
    let cat = common::seed_category(&state, "General").await;
    let item = common::seed_item(&state, "Cable", cat.id, 0, 0).await;

    let t0 = Utc::now();
    let mut stocked_in: i32 = 0;
    let mut active_issued: i32 = 0;

    for (i, qty) in [10, 5, 25].into_iter().enumerate() {
        state
            .stock_ins
            .create_stock_in(
                NewStockIn {
                    received_by: keeper.id,
                    lines: vec![StockLine {
                        item_id: item.id,
                        quantity: qty,
                    }],
                    comment: format!("delivery {}", i),
                    received_at: None,
                    document: None,
                },
                t0,
            )
            .await
            .expect("stock-in applies");
        stocked_in += qty;
        assert_eq!(
            common::quantity_of(&state, item.id).await,
            stocked_in - active_issued
        );
    }

    let mut issuance_ids = vec![];
    for qty in [4, 3, 6] {
        let header = state
            .issuances
            .create_issuance(
                NewIssuance {
                    staff_id: staff.id,
                    issued_by: keeper.id,
                    lines: vec![StockLine {
                        item_id: item.id,
                        quantity: qty,
                    }],
                    comment: String::new(),
                },
                t0,
            )
            .await
            .expect("issuance applies");
        issuance_ids.push(header.id);
        active_issued += qty;
        assert_eq!(
            common::quantity_of(&state, item.id).await,
            stocked_in - active_issued
        );
    }

    // Reverse the middle issuance; its 3 units come back into "active" terms
    state
        .reversals
        .reverse_issuance(issuance_ids[1], keeper.id, t0 + Duration::hours(1))
        .await
        .expect("reversal applies");
    active_issued -= 3;

    assert_eq!(
        common::quantity_of(&state, item.id).await,
        stocked_in - active_issued
    );
    assert_eq!(common::quantity_of(&state, item.id).await, 40 - 10 + 3);
}

/// Non-negativity: no interleaving of issuances may drive quantity below
/// zero, even under contention. 20 concurrent single-unit requests against
/// a stock of 10 must succeed exactly 10 times.
#[tokio::test]
async fn concurrent_issuances_never_oversell() {
    let state = common::setup_state().await;
    let keeper = common::seed_user(&state, "storekeeper", "Store Keeper").await;
    let staff = common::seed_staff(&state, "OPS001", "Jane Poe", None).await;
    let cat = common::seed_category(&state, "General").await;
    let item = common::seed_item(&state, "Bolt", cat.id, 10, 0).await;

    let mut tasks = vec![];
    for _ in 0..20 {
        let state = state.clone();
        let staff_id = staff.id;
        let keeper_id = keeper.id;
        let item_id = item.id;
        tasks.push(tokio::spawn(async move {
            state
                .issuances
                .create_issuance(
                    NewIssuance {
                        staff_id,
                        issued_by: keeper_id,
                        lines: vec![StockLine {
                            item_id,
                            quantity: 1,
                        }],
                        comment: String::new(),
                    },
                    Utc::now(),
                )
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.expect("task completes") {
            successes += 1;
        }
    }

    assert_eq!(
        successes, 10,
        "exactly 10 issuances should succeed; got {}",
        successes
    );
    assert_eq!(common::quantity_of(&state, item.id).await, 0);
}

/// Overlapping multi-item batches in opposite listing order must all apply
/// cleanly; the ascending-id lock order means neither interleaving can
/// deadlock or partially apply.
#[tokio::test]
async fn overlapping_batches_in_opposite_order_apply_fully() {
    let state = common::setup_state().await;
    let keeper = common::seed_user(&state, "storekeeper", "Store Keeper").await;
    let cat = common::seed_category(&state, "General").await;
    let a = common::seed_item(&state, "Item A", cat.id, 0, 0).await;
    let b = common::seed_item(&state, "Item B", cat.id, 0, 0).await;

    let mut tasks = vec![];
    for i in 0..10 {
        let state = state.clone();
        let keeper_id = keeper.id;
        // Alternate the caller's listing order; the engine still locks ascending
        let lines = if i % 2 == 0 {
            vec![
                StockLine {
                    item_id: a.id,
                    quantity: 1,
                },
                StockLine {
                    item_id: b.id,
                    quantity: 2,
                },
            ]
        } else {
            vec![
                StockLine {
                    item_id: b.id,
                    quantity: 2,
                },
                StockLine {
                    item_id: a.id,
                    quantity: 1,
                },
            ]
        };
        tasks.push(tokio::spawn(async move {
            state
                .stock_ins
                .create_stock_in(
                    NewStockIn {
                        received_by: keeper_id,
                        lines,
                        comment: String::new(),
                        received_at: None,
                        document: None,
                    },
                    Utc::now(),
                )
                .await
                .expect("stock-in applies");
        }));
    }

    for task in tasks {
        task.await.expect("task completes");
    }

    assert_eq!(common::quantity_of(&state, a.id).await, 10);
    assert_eq!(common::quantity_of(&state, b.id).await, 20);
}

/// Protect-on-delete: an item referenced by any ledger line must refuse
/// deletion; an unreferenced item deletes cleanly.
#[tokio::test]
async fn referenced_items_cannot_be_deleted() {
    let state = common::setup_state().await;
    let keeper = common::seed_user(&state, "storekeeper", "Store Keeper").await;
    let cat = common::seed_category(&state, "General").await;
    let referenced = common::seed_item(&state, "Anchor", cat.id, 0, 0).await;
    let unreferenced = common::seed_item(&state, "Spare", cat.id, 0, 0).await;

    state
        .stock_ins
        .create_stock_in(
            NewStockIn {
                received_by: keeper.id,
                lines: vec![StockLine {
                    item_id: referenced.id,
                    quantity: 5,
                }],
                comment: String::new(),
                received_at: None,
                document: None,
            },
            Utc::now(),
        )
        .await
        .expect("stock-in applies");

    let err = state.items.delete(referenced.id).await.unwrap_err();
    assert!(err.to_string().contains("cannot be deleted"));
    assert!(state.items.get(referenced.id).await.is_ok());

    state
        .items
        .delete(unreferenced.id)
        .await
        .expect("unreferenced item deletes");
    assert!(state.items.get(unreferenced.id).await.is_err());
}

/// Low-stock and out-of-stock dashboards reflect engine mutations.
#[tokio::test]
async fn stock_position_queries_track_quantities() {
    let state = common::setup_state().await;
    let keeper = common::seed_user(&state, "storekeeper", "Store Keeper").await;
    let staff = common::seed_staff(&state, "OPS001", "Jane Poe", None).await;
    let cat = common::seed_category(&state, "General").await;
    let depleted = common::seed_item(&state, "Chalk", cat.id, 2, 0).await;
    let low = common::seed_item(&state, "Chisel", cat.id, 6, 5).await;
    let healthy = common::seed_item(&state, "Clamp", cat.id, 50, 5).await;

    state
        .issuances
        .create_issuance(
            NewIssuance {
                staff_id: staff.id,
                issued_by: keeper.id,
                lines: vec![
                    StockLine {
                        item_id: depleted.id,
                        quantity: 2,
                    },
                    StockLine {
                        item_id: low.id,
                        quantity: 2,
                    },
                ],
                comment: String::new(),
            },
            Utc::now(),
        )
        .await
        .expect("issuance applies");

    let out = state.items.out_of_stock().await.expect("query");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, depleted.id);

    let low_rows = state.items.low_stock().await.expect("query");
    assert_eq!(low_rows.len(), 1);
    assert_eq!(low_rows[0].id, low.id);

    assert_eq!(common::quantity_of(&state, healthy.id).await, 50);
}
