mod common;

use assert_matches::assert_matches;
use chrono::{Duration, SubsecRound, Utc};

use storeroom_api::entities::activity::ActivityVerb;
use storeroom_api::entities::issuance::IssuanceStatus;
use storeroom_api::errors::{ReversalFailure, ServiceError};
use storeroom_api::services::issuance::NewIssuance;
use storeroom_api::services::StockLine;
use storeroom_api::AppState;

struct Fixture {
    keeper_id: i64,
    item_a: i64,
    item_b: i64,
    issuance_id: i64,
}

/// Issues Item A −5 and Item B −10 from 50/20 at `issued_at`.
async fn issue_two_lines(state: &AppState, issued_at: chrono::DateTime<Utc>) -> Fixture {
    let keeper = common::seed_user(state, "store1", "Store Keeper").await;
    let ops = common::seed_department(state, "Operations").await;
    let staff = common::seed_staff(state, "SK001", "Store Keeper", Some(ops.id)).await;
    let cat = common::seed_category(state, "General").await;
    let item_a = common::seed_item(state, "Item A", cat.id, 50, 0).await;
    let item_b = common::seed_item(state, "Item B", cat.id, 20, 0).await;

    let issuance = state
        .issuances
        .create_issuance(
            NewIssuance {
                staff_id: staff.id,
                issued_by: keeper.id,
                lines: vec![
                    StockLine {
                        item_id: item_a.id,
                        quantity: 5,
                    },
                    StockLine {
                        item_id: item_b.id,
                        quantity: 10,
                    },
                ],
                comment: "Test issuance".into(),
            },
            issued_at,
        )
        .await
        .expect("issuance applies");

    Fixture {
        keeper_id: keeper.id,
        item_a: item_a.id,
        item_b: item_b.id,
        issuance_id: issuance.id,
    }
}

#[tokio::test]
async fn reversal_restores_quantities_and_marks_header() {
    let state = common::setup_state().await;
    let t0 = Utc::now().trunc_subsecs(0);
    let fx = issue_two_lines(&state, t0).await;

    assert_eq!(common::quantity_of(&state, fx.item_a).await, 45);
    assert_eq!(common::quantity_of(&state, fx.item_b).await, 10);

    let reversed = state
        .reversals
        .reverse_issuance(fx.issuance_id, fx.keeper_id, t0 + Duration::hours(1))
        .await
        .expect("reversal applies");

    assert!(reversed.is_reversed);
    assert_eq!(reversed.reversed_by, Some(fx.keeper_id));
    assert_eq!(reversed.reversed_at, Some(t0 + Duration::hours(1)));
    assert_eq!(common::quantity_of(&state, fx.item_a).await, 55);
    assert_eq!(common::quantity_of(&state, fx.item_b).await, 30);
    assert_eq!(
        reversed.status_at(t0 + Duration::hours(2)),
        IssuanceStatus::Reversed
    );

    let activities = state.activities.recent(10).await.expect("feed");
    let reversal_record = activities
        .iter()
        .find(|a| a.verb() == Some(ActivityVerb::IssuanceReversed))
        .expect("reversal audited");
    assert_eq!(reversal_record.target_id, fx.issuance_id);
    assert_eq!(reversal_record.metadata["items"][0]["item"], "Item A");
    assert_eq!(reversal_record.metadata["items"][1]["item"], "Item B");
}

#[tokio::test]
async fn second_reversal_fails_and_credits_nothing() {
    let state = common::setup_state().await;
    let t0 = Utc::now().trunc_subsecs(0);
    let fx = issue_two_lines(&state, t0).await;

    state
        .reversals
        .reverse_issuance(fx.issuance_id, fx.keeper_id, t0 + Duration::hours(1))
        .await
        .expect("first reversal applies");

    let err = state
        .reversals
        .reverse_issuance(fx.issuance_id, fx.keeper_id, t0 + Duration::hours(2))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::Reversal(ReversalFailure::AlreadyReversed { .. })
    );
    assert_eq!(err.to_string(), "This issuance has already been reversed.");

    // No double credit
    assert_eq!(common::quantity_of(&state, fx.item_a).await, 55);
    assert_eq!(common::quantity_of(&state, fx.item_b).await, 30);
}

#[tokio::test]
async fn reversal_after_window_fails_with_no_mutation() {
    let state = common::setup_state().await;
    let t0 = Utc::now().trunc_subsecs(0) - Duration::hours(7);
    let fx = issue_two_lines(&state, t0).await;

    let err = state
        .reversals
        .reverse_issuance(fx.issuance_id, fx.keeper_id, t0 + Duration::hours(7))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::Reversal(ReversalFailure::WindowExpired { .. })
    );
    assert_eq!(err.to_string(), "Reversal window has expired.");

    assert_eq!(common::quantity_of(&state, fx.item_a).await, 45);
    assert_eq!(common::quantity_of(&state, fx.item_b).await, 10);

    let (header, _) = state
        .issuances
        .get_with_lines(fx.issuance_id)
        .await
        .expect("header intact");
    assert!(!header.is_reversed);
    assert_eq!(
        header.status_at(t0 + Duration::hours(7)),
        IssuanceStatus::Locked
    );
}

#[tokio::test]
async fn deadline_is_inclusive() {
    let state = common::setup_state().await;
    let t0 = Utc::now().trunc_subsecs(0) - Duration::hours(6);
    let fx = issue_two_lines(&state, t0).await;

    // Exactly at the deadline: allowed
    let reversed = state
        .reversals
        .reverse_issuance(fx.issuance_id, fx.keeper_id, t0 + Duration::hours(6))
        .await
        .expect("boundary reversal applies");
    assert!(reversed.is_reversed);
}

#[tokio::test]
async fn one_second_past_deadline_is_rejected() {
    let state = common::setup_state().await;
    let t0 = Utc::now().trunc_subsecs(0) - Duration::hours(6);
    let fx = issue_two_lines(&state, t0).await;

    let err = state
        .reversals
        .reverse_issuance(
            fx.issuance_id,
            fx.keeper_id,
            t0 + Duration::hours(6) + Duration::seconds(1),
        )
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::Reversal(ReversalFailure::WindowExpired { .. })
    );
}

#[tokio::test]
async fn reversing_missing_issuance_is_not_found() {
    let state = common::setup_state().await;
    let keeper = common::seed_user(&state, "store1", "Store Keeper").await;

    let err = state
        .reversals
        .reverse_issuance(555, keeper.id, Utc::now())
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn concurrent_double_reversal_succeeds_exactly_once() {
    let state = common::setup_state().await;
    let t0 = Utc::now().trunc_subsecs(0);
    let fx = issue_two_lines(&state, t0).await;

    let mut tasks = vec![];
    for _ in 0..2 {
        let state = state.clone();
        let issuance_id = fx.issuance_id;
        let keeper_id = fx.keeper_id;
        tasks.push(tokio::spawn(async move {
            state
                .reversals
                .reverse_issuance(issuance_id, keeper_id, t0 + Duration::hours(1))
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

    assert_eq!(successes, 1, "exactly one reversal may win");
    assert_eq!(common::quantity_of(&state, fx.item_a).await, 55);
    assert_eq!(common::quantity_of(&state, fx.item_b).await, 30);
}
