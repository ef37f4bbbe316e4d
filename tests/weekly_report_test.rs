mod common;

use chrono::{Duration, TimeZone, Utc};

use storeroom_api::services::issuance::NewIssuance;
use storeroom_api::services::reports::render_csv;
use storeroom_api::services::StockLine;
use storeroom_api::AppState;

async fn issue(
    state: &AppState,
    staff_id: i64,
    issued_by: i64,
    item_id: i64,
    quantity: i32,
    issued_at: chrono::DateTime<Utc>,
) -> i64 {
    state
        .issuances
        .create_issuance(
            NewIssuance {
                staff_id,
                issued_by,
                lines: vec![StockLine { item_id, quantity }],
                comment: String::new(),
            },
            issued_at,
        )
        .await
        .expect("issuance applies")
        .id
}

#[tokio::test]
async fn weekly_usage_aggregates_per_item_and_department() {
    let state = common::setup_state().await;
    let keeper = common::seed_user(&state, "storekeeper", "Store Keeper").await;

    let engineering = common::seed_department(&state, "Engineering").await;
    let operations = common::seed_department(&state, "Operations").await;
    let eng_staff = common::seed_staff(&state, "ENG001", "John Doe", Some(engineering.id)).await;
    let ops_staff = common::seed_staff(&state, "OPS001", "Jane Poe", Some(operations.id)).await;
    let unassigned = common::seed_staff(&state, "TMP001", "Temp Worker", None).await;

    let cat = common::seed_category(&state, "General").await;
    let cement = common::seed_item(&state, "Cement", cat.id, 100, 0).await;
    let helmet = common::seed_item(&state, "Helmet", cat.id, 50, 0).await;

    // Report week containing Tuesday 2025-03-11: Mon 03-10 through Sun 03-16
    let monday = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 11, 12, 0, 0).unwrap();

    issue(&state, eng_staff.id, keeper.id, cement.id, 8, monday).await;
    issue(&state, ops_staff.id, keeper.id, cement.id, 4, monday).await;
    issue(&state, eng_staff.id, keeper.id, helmet.id, 3, monday).await;
    issue(&state, unassigned.id, keeper.id, helmet.id, 1, monday).await;

    // The prior week must not leak into this report
    let last_week = monday - Duration::days(3);
    issue(&state, eng_staff.id, keeper.id, cement.id, 50, last_week).await;

    // A reversed issuance still counts toward the week it happened in
    let reversed = issue(&state, ops_staff.id, keeper.id, cement.id, 2, monday).await;
    state
        .reversals
        .reverse_issuance(reversed, keeper.id, monday + Duration::hours(1))
        .await
        .expect("reversal applies");

    let report = state.reports.weekly_usage(now).await.expect("report");

    assert_eq!(
        report.start,
        Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap()
    );
    assert_eq!(
        report.end,
        Utc.with_ymd_and_hms(2025, 3, 16, 17, 59, 59).unwrap()
    );

    assert_eq!(report.rows.len(), 2);

    let cement_row = &report.rows[0];
    assert_eq!(cement_row.item, "Cement");
    assert_eq!(cement_row.total_quantity, 14);
    assert_eq!(
        cement_row.departments_with_usage,
        "Engineering (8), Operations (6)"
    );

    let helmet_row = &report.rows[1];
    assert_eq!(helmet_row.item, "Helmet");
    assert_eq!(helmet_row.total_quantity, 4);
    assert_eq!(
        helmet_row.departments_with_usage,
        "Engineering (3), Unassigned (1)"
    );
}

#[tokio::test]
async fn rows_order_by_total_then_name() {
    let state = common::setup_state().await;
    let keeper = common::seed_user(&state, "storekeeper", "Store Keeper").await;
    let dept = common::seed_department(&state, "Engineering").await;
    let staff = common::seed_staff(&state, "ENG001", "John Doe", Some(dept.id)).await;
    let cat = common::seed_category(&state, "General").await;

    let alpha = common::seed_item(&state, "Alpha", cat.id, 50, 0).await;
    let beta = common::seed_item(&state, "Beta", cat.id, 50, 0).await;
    let gamma = common::seed_item(&state, "Gamma", cat.id, 50, 0).await;

    let monday = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 11, 12, 0, 0).unwrap();

    issue(&state, staff.id, keeper.id, beta.id, 5, monday).await;
    issue(&state, staff.id, keeper.id, alpha.id, 5, monday).await;
    issue(&state, staff.id, keeper.id, gamma.id, 9, monday).await;

    let report = state.reports.weekly_usage(now).await.expect("report");
    let names: Vec<&str> = report.rows.iter().map(|r| r.item.as_str()).collect();

    // Gamma leads on volume; Alpha and Beta tie and fall back to name order
    assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
}

#[tokio::test]
async fn csv_export_matches_report_rows() {
    let state = common::setup_state().await;
    let keeper = common::seed_user(&state, "storekeeper", "Store Keeper").await;
    let dept = common::seed_department(&state, "Engineering").await;
    let staff = common::seed_staff(&state, "ENG001", "John Doe", Some(dept.id)).await;
    let cat = common::seed_category(&state, "General").await;
    let cement = common::seed_item(&state, "Cement", cat.id, 50, 0).await;

    let monday = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 11, 12, 0, 0).unwrap();

    issue(&state, staff.id, keeper.id, cement.id, 12, monday).await;

    let report = state.reports.weekly_usage(now).await.expect("report");
    let csv = render_csv(&report.rows);

    assert_eq!(
        csv,
        "Item,Total Issued,Departments with Usage\r\nCement,12,Engineering (12)\r\n"
    );
}

#[tokio::test]
async fn empty_week_produces_empty_report() {
    let state = common::setup_state().await;

    let now = Utc.with_ymd_and_hms(2025, 3, 11, 12, 0, 0).unwrap();
    let report = state.reports.weekly_usage(now).await.expect("report");

    assert!(report.rows.is_empty());
    assert_eq!(
        render_csv(&report.rows),
        "Item,Total Issued,Departments with Usage\r\n"
    );
}
