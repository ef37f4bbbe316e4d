use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc, Weekday};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use tracing::instrument;

use crate::entities::{department, issuance, issuance_line, item, staff};
use crate::errors::ServiceError;

/// When the weekly report may be viewed.
pub const REPORT_WINDOW_LABEL: &str = "Sunday 6:00 PM → Tuesday 11:59 PM";

/// Hour on Sunday from which the finished week's report opens.
const SUNDAY_EVENING_START_HOUR: u32 = 18;

/// Usage of one item over the report week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct WeeklyReportRow {
    pub item: String,
    pub total_quantity: i64,
    /// "Engineering (12), Operations (3)" — departments by descending usage.
    pub departments_with_usage: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub rows: Vec<WeeklyReportRow>,
}

/// Whether the weekly report is viewable at `now`.
///
/// Open from Sunday 18:00 through Tuesday 23:59; the report covers the week
/// that ends that Sunday.
pub fn report_window_open(now: DateTime<Utc>) -> bool {
    match now.weekday() {
        Weekday::Sun => now.hour() >= SUNDAY_EVENING_START_HOUR,
        Weekday::Mon | Weekday::Tue => true,
        _ => false,
    }
}

/// Report week for the week containing `now`: Monday 00:00:00 through
/// Sunday 17:59:59 (the report is produced at Sunday 6:00 PM).
pub fn report_week_range(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let days_from_monday = now.weekday().num_days_from_monday() as i64;
    let monday = now.date_naive() - Duration::days(days_from_monday);

    let start = monday.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(6) + Duration::hours(17) + Duration::minutes(59)
        + Duration::seconds(59);

    (start, end)
}

/// Renders report rows as CSV with the export's fixed column set.
pub fn render_csv(rows: &[WeeklyReportRow]) -> String {
    let mut out = String::from("Item,Total Issued,Departments with Usage\r\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{}\r\n",
            csv_field(&row.item),
            row.total_quantity,
            csv_field(&row.departments_with_usage),
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Aggregates issued quantities per item over the report week.
#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DatabaseConnection>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Builds the weekly usage report for the week containing `now`.
    ///
    /// Counts every issuance line whose header falls inside the week,
    /// clamped to `now` so nothing in the future is counted. Rows come back
    /// ordered by descending total, then item name.
    #[instrument(skip(self))]
    pub async fn weekly_usage(&self, now: DateTime<Utc>) -> Result<WeeklyReport, ServiceError> {
        let db = &*self.db_pool;

        let (start, end) = report_week_range(now);
        let effective_end = end.min(now);

        let lines: Vec<(issuance_line::Model, Option<issuance::Model>)> =
            issuance_line::Entity::find()
                .find_also_related(issuance::Entity)
                .filter(issuance::Column::IssuedAt.gte(start))
                .filter(issuance::Column::IssuedAt.lte(effective_end))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;

        let item_names = self.item_names(&lines).await?;
        let staff_departments = self.staff_departments(&lines).await?;

        // item name -> (total, department -> count)
        let mut agg: HashMap<String, (i64, HashMap<String, i64>)> = HashMap::new();

        for (line, header) in &lines {
            let Some(header) = header else { continue };

            let item_name = match item_names.get(&line.item_id) {
                Some(name) => name.clone(),
                None => continue,
            };
            let dept_name = staff_departments
                .get(&header.staff_id)
                .cloned()
                .unwrap_or_else(|| "Unassigned".to_string());

            let entry = agg.entry(item_name).or_default();
            entry.0 += line.quantity as i64;
            *entry.1.entry(dept_name).or_default() += line.quantity as i64;
        }

        let mut rows: Vec<WeeklyReportRow> = agg
            .into_iter()
            .map(|(item, (total, dept_counts))| {
                let mut parts: Vec<(String, i64)> = dept_counts.into_iter().collect();
                parts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

                let departments_with_usage = parts
                    .into_iter()
                    .map(|(dept, qty)| format!("{} ({})", dept, qty))
                    .collect::<Vec<_>>()
                    .join(", ");

                WeeklyReportRow {
                    item,
                    total_quantity: total,
                    departments_with_usage,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total_quantity
                .cmp(&a.total_quantity)
                .then_with(|| a.item.cmp(&b.item))
        });

        Ok(WeeklyReport { start, end, rows })
    }

    async fn item_names(
        &self,
        lines: &[(issuance_line::Model, Option<issuance::Model>)],
    ) -> Result<HashMap<i64, String>, ServiceError> {
        let db = &*self.db_pool;

        let item_ids: Vec<i64> = lines.iter().map(|(l, _)| l.item_id).collect();
        let items = item::Entity::find()
            .filter(item::Column::Id.is_in(item_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(items.into_iter().map(|i| (i.id, i.name)).collect())
    }

    async fn staff_departments(
        &self,
        lines: &[(issuance_line::Model, Option<issuance::Model>)],
    ) -> Result<HashMap<i64, String>, ServiceError> {
        let db = &*self.db_pool;

        let staff_ids: Vec<i64> = lines
            .iter()
            .filter_map(|(_, h)| h.as_ref().map(|h| h.staff_id))
            .collect();
        let staff_rows = staff::Entity::find()
            .filter(staff::Column::Id.is_in(staff_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let dept_ids: Vec<i64> = staff_rows.iter().filter_map(|s| s.department_id).collect();
        let departments: HashMap<i64, String> = department::Entity::find()
            .filter(department::Column::Id.is_in(dept_ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();

        Ok(staff_rows
            .into_iter()
            .map(|s| {
                let dept = s.department_id.and_then(|id| departments.get(&id).cloned());
                (s.id, dept.unwrap_or_else(|| "Unassigned".to_string()))
            })
            .collect())
    }
}
